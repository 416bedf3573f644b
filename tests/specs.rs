// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level behavior specs, exercising the crates together the
//! way the daemon does.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use prost::Message as _;
use tempfile::tempdir;
use weir_core::{BufferConfig, Field, Message, RetryHelper, RetryOptions};
use weir_matcher::MatcherSpecification;
use weir_pipeline::test_support::{CollectingOutput, StaticInput};
use weir_pipeline::{OutputOptions, Pipeline, ProtobufEncoder};
use weir_wire::{
    decode_frame, write_framed, FramingSplitter, Split, StreamSplitter, TokenSplitter,
    DEFAULT_MAX_MESSAGE_SIZE, RECORD_SEPARATOR, UNIT_SEPARATOR,
};

fn typed_message(msg_type: &str) -> Message {
    Message::new(msg_type)
}

#[test]
fn matcher_smoke_on_report_types() {
    let spec = MatcherSpecification::new(
        "Type == \"weir.all-report\" || Type == \"weir.sandbox-terminated\"",
    )
    .unwrap();

    assert!(spec.is_match(&typed_message("weir.all-report")));
    assert!(!spec.is_match(&typed_message("other")));
    assert!(!spec.is_match(&Message::default()));
}

#[test]
fn field_matcher_with_occurrences() {
    let spec =
        MatcherSpecification::new("Fields[status] == 200 && Fields[host][0] == \"a.example\"")
            .unwrap();

    let mut message = typed_message("request");
    message.add_field(Field::new("status", 200i64));
    message.add_field(Field::new("host", "a.example"));
    message.add_field(Field::new("host", "b.example"));

    assert!(spec.is_match(&message));
}

#[test]
fn framing_round_trip_preserves_the_message() {
    let mut message = typed_message("framed");
    message.payload = Some("hello".to_string());
    let msg_bytes = message.encode_to_vec();

    let mut framed = Vec::new();
    write_framed(&mut framed, &msg_bytes, None).unwrap();

    let mut reader = Cursor::new(framed);
    let mut splitter = StreamSplitter::new(FramingSplitter::new(DEFAULT_MAX_MESSAGE_SIZE));
    let Split::Record(record) = splitter.next(&mut reader).unwrap() else {
        panic!("expected one record");
    };

    assert_eq!(record[0], RECORD_SEPARATOR);
    let header_len = record[1] as usize;
    assert_eq!(record[2 + header_len], UNIT_SEPARATOR);
    assert_eq!(&record[3 + header_len..], msg_bytes.as_slice());

    let (header, body) = decode_frame(record).unwrap();
    assert_eq!(header.message_length as usize, msg_bytes.len());
    let parsed = Message::decode(body).unwrap();
    assert_eq!(parsed.payload(), "hello");
}

#[test]
fn queue_durability_with_forty_byte_records() {
    let dir = tempdir().unwrap();
    let config = BufferConfig {
        max_file_size: 128,
        max_buffer_size: 4096,
        ..Default::default()
    };
    let (mut writer, mut reader) = weir_queue::open(dir.path(), &config).unwrap();

    for i in 0..10u8 {
        // 35 message bytes frame to 40 on disk.
        writer.append(&vec![i; 35]).unwrap();
    }

    let mut segments: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.unwrap().file_name().into_string().ok())
        .filter(|name| name.ends_with(".log"))
        .collect();
    segments.sort();
    assert_eq!(segments, vec!["0.log", "1.log", "2.log", "3.log"]);
    assert_eq!(writer.total_size(), 400);

    reader.advance_cursor("2 0").unwrap();
    assert!(!dir.path().join("0.log").exists());
    assert!(!dir.path().join("1.log").exists());
    // Remaining segments: 120 + 40 bytes.
    assert_eq!(reader.total_size(), 160);
}

#[tokio::test(start_paused = true)]
async fn retry_backoff_doubles_to_the_cap() {
    let mut helper = RetryHelper::new(RetryOptions {
        delay_ms: 10,
        max_delay_ms: 80,
        max_jitter_ms: 0,
        max_retries: -1,
    });

    let mut observed = Vec::new();
    for _ in 0..6 {
        let before = tokio::time::Instant::now();
        helper.wait().await.unwrap();
        observed.push(before.elapsed().as_millis() as u64);
    }
    assert_eq!(observed, vec![10, 20, 40, 80, 80, 80]);
}

#[test]
fn token_splitter_exposes_the_partial_final_record() {
    let mut reader = Cursor::new(b"a\nbb\nccc".to_vec());
    let mut splitter = StreamSplitter::new(TokenSplitter::default());

    assert_eq!(splitter.next(&mut reader).unwrap(), Split::Record(b"a\n"));
    assert_eq!(splitter.next(&mut reader).unwrap(), Split::Record(b"bb\n"));
    assert_eq!(splitter.next(&mut reader).unwrap(), Split::Eof);
    assert_eq!(splitter.remaining(), b"ccc");
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn pipeline_routes_only_matching_messages_to_each_output() {
    let pipeline = Pipeline::new(Default::default());

    let reports = CollectingOutput::default();
    let metrics = CollectingOutput::default();
    let report_sent = Arc::clone(&reports.sent);
    let metric_sent = Arc::clone(&metrics.sent);

    pipeline
        .add_output(
            "reports",
            Box::new(reports),
            Box::new(ProtobufEncoder),
            OutputOptions { matcher: "Type == \"report\"".to_string(), ..Default::default() },
        )
        .await
        .unwrap();
    pipeline
        .add_output(
            "metrics",
            Box::new(metrics),
            Box::new(ProtobufEncoder),
            OutputOptions { matcher: "Type == \"metric\"".to_string(), ..Default::default() },
        )
        .await
        .unwrap();

    let mut report = typed_message("report");
    report.payload = Some("r".to_string());
    let mut metric_a = typed_message("metric");
    metric_a.payload = Some("m1".to_string());
    let mut metric_b = typed_message("metric");
    metric_b.payload = Some("m2".to_string());

    pipeline
        .add_input(
            "static",
            Box::new(StaticInput { messages: vec![report, metric_a, metric_b] }),
            None,
            Default::default(),
        )
        .unwrap();

    wait_until(|| report_sent.lock().len() == 1 && metric_sent.lock().len() == 2).await;

    // Per-destination delivery preserves injection order.
    let metric_payloads: Vec<String> = metric_sent
        .lock()
        .iter()
        .map(|bytes| Message::decode(bytes.as_slice()).unwrap().payload().to_string())
        .collect();
    assert_eq!(metric_payloads, vec!["m1".to_string(), "m2".to_string()]);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn buffered_output_redelivers_after_restart() {
    let dir = tempdir().unwrap();
    let buffer = BufferConfig {
        queue_dir: dir.path().to_path_buf(),
        max_file_size: 256,
        ..Default::default()
    };

    // First run: the sink never accepts; the output gives up after its
    // retries, leaving the record spooled and unacknowledged.
    {
        let pipeline = Pipeline::new(Default::default());
        let dead_sink = CollectingOutput::failing(u32::MAX);
        pipeline
            .add_output(
                "spooler",
                Box::new(dead_sink),
                Box::new(ProtobufEncoder),
                OutputOptions {
                    buffer: Some(buffer.clone()),
                    retry: RetryOptions {
                        delay_ms: 1,
                        max_jitter_ms: 0,
                        max_retries: 2,
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut message = typed_message("evt");
        message.payload = Some("durable".to_string());
        pipeline
            .add_input(
                "static",
                Box::new(StaticInput { messages: vec![message] }),
                None,
                Default::default(),
            )
            .unwrap();

        let queue_file = dir.path().join("spooler").join("0.log");
        wait_until(|| queue_file.exists() && std::fs::metadata(&queue_file).unwrap().len() > 0)
            .await;
        pipeline.shutdown().await;
    }

    // Second run: a healthy sink drains the queue from the checkpoint.
    let pipeline = Pipeline::new(Default::default());
    let sink = CollectingOutput::default();
    let sent = Arc::clone(&sink.sent);
    pipeline
        .add_output(
            "spooler",
            Box::new(sink),
            Box::new(ProtobufEncoder),
            OutputOptions { buffer: Some(buffer), ..Default::default() },
        )
        .await
        .unwrap();

    wait_until(|| !sent.lock().is_empty()).await;
    let delivered = sent.lock().clone();
    assert_eq!(Message::decode(delivered[0].as_slice()).unwrap().payload(), "durable");

    pipeline.shutdown().await;
}
