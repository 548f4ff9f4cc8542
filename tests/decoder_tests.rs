//! Stream decoder tests over streamed and buffered bodies.

mod common;

use bytes::Bytes;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use abacus::error::{AbacusError, Result};
use abacus::stream::StreamDecoder;
use abacus::transport::ResponseBody;

use common::{sse_body, DeltaLog};

fn chunked(chunks: Vec<String>) -> ResponseBody {
    let items: Vec<Result<Bytes>> = chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
    ResponseBody::Streaming(futures::stream::iter(items).boxed())
}

fn buffered(body: String) -> ResponseBody {
    ResponseBody::Buffered(Bytes::from(body))
}

#[tokio::test]
async fn streamed_and_buffered_bodies_decode_identically() {
    let body = sse_body(&["Hel", "lo"]);
    let split_at = body.find("lo").unwrap() - 3;
    let (head, tail) = body.split_at(split_at);

    let streamed = DeltaLog::default();
    let text = StreamDecoder::new()
        .with_sink(streamed.sink())
        .decode(chunked(vec![head.to_string(), tail.to_string()]))
        .await
        .unwrap();
    assert_eq!(text, "Hello");

    let whole = DeltaLog::default();
    let text = StreamDecoder::new()
        .with_sink(whole.sink())
        .decode(buffered(body))
        .await
        .unwrap();
    assert_eq!(text, "Hello");

    let expected = vec![
        ("Hel".to_string(), false),
        ("lo".to_string(), false),
        (String::new(), true),
    ];
    assert_eq!(streamed.entries(), expected);
    assert_eq!(whole.entries(), expected);
    assert_eq!(streamed.text(), text);
}

#[tokio::test]
async fn bare_json_lines_then_done_in_both_modes() {
    let body = concat!(
        "{\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n",
        "{\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n",
        "data: [DONE]\n",
    );
    let expected = vec![
        ("Hi".to_string(), false),
        (" there".to_string(), false),
        (String::new(), true),
    ];

    let streamed = DeltaLog::default();
    let lines = body.split_inclusive('\n').map(str::to_string).collect();
    let streamed_text = StreamDecoder::new()
        .with_sink(streamed.sink())
        .decode(chunked(lines))
        .await
        .unwrap();

    let whole = DeltaLog::default();
    let whole_text = StreamDecoder::new()
        .with_sink(whole.sink())
        .decode(buffered(body.to_string()))
        .await
        .unwrap();

    assert_eq!(streamed_text, "Hi there");
    assert_eq!(whole_text, "Hi there");
    assert_eq!(streamed.entries(), expected);
    assert_eq!(whole.entries(), expected);
    assert_eq!(streamed.text(), streamed_text);
    assert_eq!(whole.text(), whole_text);
}

#[tokio::test]
async fn junk_and_comment_lines_are_skipped() {
    let body = concat!(
        ": keep-alive\n",
        "event: message\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"记\"}}]}\n",
        "data: not json\n",
        "data: {\"choices\":[{\"delta\":{}}]}\n",
        "{\"content\":\"账\"}\n",
        "data: [DONE]\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
    );
    let log = DeltaLog::default();

    let text = StreamDecoder::new()
        .with_sink(log.sink())
        .decode(buffered(body.to_string()))
        .await
        .unwrap();

    assert_eq!(text, "记账");
    assert_eq!(log.text(), text);
    assert_eq!(log.completions(), 1);
}

#[tokio::test]
async fn pretty_printed_json_body_falls_back_to_whole_document() {
    let body = "{\n  \"choices\": [\n    {\"message\": {\"content\": \"完成\"}}\n  ]\n}\n";
    let log = DeltaLog::default();

    let text = StreamDecoder::new()
        .with_sink(log.sink())
        .decode(buffered(body.to_string()))
        .await
        .unwrap();

    assert_eq!(text, "完成");
    assert_eq!(log.text(), text);
    assert_eq!(log.completions(), 1);
}

#[tokio::test]
async fn unrecognized_body_decodes_to_empty_text() {
    let log = DeltaLog::default();

    let text = StreamDecoder::new()
        .with_sink(log.sink())
        .decode(buffered("<html>gateway</html>".to_string()))
        .await
        .unwrap();

    assert_eq!(text, "");
    assert_eq!(log.text(), text);
    assert_eq!(log.entries(), vec![(String::new(), true)]);
}

#[tokio::test]
async fn stream_error_is_propagated() {
    let items: Vec<Result<Bytes>> = vec![
        Ok(Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n",
        )),
        Err(AbacusError::Stream("connection reset".into())),
    ];
    let body = ResponseBody::Streaming(futures::stream::iter(items).boxed());

    let err = StreamDecoder::new().decode(body).await.unwrap_err();

    assert!(matches!(err, AbacusError::Stream(_)));
}

#[tokio::test]
async fn canceled_decoder_stops_emitting() {
    let token = CancellationToken::new();
    let log = DeltaLog::default();
    let (tx, rx) = futures::channel::mpsc::unbounded::<Result<Bytes>>();
    let body = ResponseBody::Streaming(rx.boxed());

    tx.unbounded_send(Ok(Bytes::from(
        "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\n",
    )))
    .unwrap();

    let decoder = StreamDecoder::new()
        .with_sink(log.sink())
        .with_cancellation(token.clone());
    let handle = tokio::spawn(async move { decoder.decode(body).await });

    while log.entries().is_empty() {
        tokio::task::yield_now().await;
    }
    token.cancel();
    let _ = tx.unbounded_send(Ok(Bytes::from(
        "data: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}\n",
    )));

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(AbacusError::Canceled)));
    assert_eq!(log.entries(), vec![("one".to_string(), false)]);
}
