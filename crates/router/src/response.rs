//! The writing half of the transport boundary.

use crate::ResponseBody;
use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use std::io;
use tracing::warn;

/// Sink for the single response of a request.
///
/// The status line and headers are write-once: they may change freely until the
/// first body bytes are written, after which they are frozen and body writes append.
/// Body bytes go through [`io::Write`], so `write!(rw, "...")?` works in handlers.
pub trait ResponseWriter: io::Write {
    /// The status that is (or will be) sent, `200 OK` unless changed.
    fn status(&self) -> StatusCode;

    /// Sets the status; ignored once the body has been written.
    fn set_status(&mut self, status: StatusCode);

    /// Inserts a response header; ignored once the body has been written.
    fn insert_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Whether body bytes have been written, freezing status and headers.
    fn is_written(&self) -> bool;
}

/// An in-memory [`ResponseWriter`], convertible into an [`http::Response`].
#[derive(Debug)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    written: bool,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: BytesMut::new(), written: false }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response<ResponseBody> {
        let mut response = Response::new(ResponseBody::once(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl io::Write for BufferedResponse {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written = true;
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for BufferedResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        if self.written {
            warn!(current = %self.status, ignored = %status, "status change after body was written");
            return;
        }
        self.status = status;
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.written {
            warn!(header = %name, "header change after body was written");
            return;
        }
        self.headers.insert(name, value);
    }

    fn is_written(&self) -> bool {
        self.written
    }
}
