// Chunked JSON streaming utilities
use crate::infrastructure::http_response::brotli;
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::Stream;
use serde::Serialize;

/// Create a chunked response with one length-prefixed JSON frame per item
pub fn chunked_json_stream<S, T>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + Sync + 'static,
{
    let byte_stream = stream.then(move |msg| async move { encode_frame(&msg, compress).await });

    // Frames are compressed one by one, so there is no Content-Encoding on
    // the response itself.
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndframe+json")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// 4 byte big-endian length, then the (optionally Brotli compressed) JSON
pub async fn encode_frame<T: Serialize>(msg: &T, compress: bool) -> std::io::Result<Bytes> {
    let json = serde_json::to_vec(msg)?;
    let payload = if compress { brotli(json).await? } else { json };

    let length = u32::try_from(payload.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "frame too large"))?;
    let mut chunk = BytesMut::with_capacity(4 + payload.len());
    chunk.put_u32(length);
    chunk.put_slice(&payload);

    Ok(chunk.freeze())
}
