//! HLS playlist rewriting.
//!
//! Media references appear either as a bare line following `#EXTINF` /
//! `#EXT-X-STREAM-INF`, or as a quoted `URI="..."` attribute of tags such as
//! `#EXT-X-KEY` and `#EXT-X-MEDIA`. Both are turned into URLs pointing back at
//! this proxy. Everything else is copied through unchanged.

use bytes::{BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use regex::bytes::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use url::Url;

use crate::error::{AppError, AppResult};

const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";
const EXTINF_TAG: &str = "#EXTINF";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// Anchored to an attribute boundary so e.g. `X-ASSET-URI="..."` is left alone.
// Matched on raw bytes, playlists are not guaranteed to be UTF-8.
static URI_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?-u)(?:^|[:,])URI="([^"]+)""#).expect("URI attribute pattern is valid")
});

pub struct PlaylistRewriter {
    base: Url,
    proxy_authority: String,
    code: Option<String>,
    expecting_uri: bool,
    first_line: bool,
    pending: Vec<u8>,
}

impl PlaylistRewriter {
    /// `base` is the fetched playlist URL that relative references resolve
    /// against, `proxy_authority` the `scheme://host[:port]` clients use to
    /// reach this proxy.
    pub fn new(base: Url, proxy_authority: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            base,
            proxy_authority: proxy_authority.into(),
            code: code.map(str::to_owned),
            expecting_uri: false,
            first_line: true,
            pending: Vec::new(),
        }
    }

    /// Drains an upstream body through the rewriter into a single buffer.
    pub async fn rewrite_stream<S, E>(mut self, body: S, capacity: usize) -> AppResult<Bytes>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<AppError>,
    {
        let mut body = std::pin::pin!(body);
        let mut out = BytesMut::with_capacity(capacity);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(Into::<AppError>::into)?;
            self.push(&chunk, &mut out);
        }
        self.finish(&mut out);
        Ok(out.freeze())
    }

    /// Rewrites a complete playlist held in memory.
    pub fn rewrite(mut self, body: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(body.len() * 2);
        self.push(body, &mut out);
        self.finish(&mut out);
        out.freeze()
    }

    /// Feeds the next chunk of playlist bytes. Complete lines are written to
    /// `out`; a trailing partial line is held until more input arrives.
    pub fn push(&mut self, chunk: &[u8], out: &mut BytesMut) {
        let mut pending = std::mem::take(&mut self.pending);
        pending.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(offset) = pending[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            self.write_line(&pending[consumed..end], out);
            consumed = end + 1;
        }

        pending.drain(..consumed);
        self.pending = pending;
    }

    /// Flushes an unterminated last line, if any.
    pub fn finish(&mut self, out: &mut BytesMut) {
        if !self.pending.is_empty() {
            let last = std::mem::take(&mut self.pending);
            self.write_line(&last, out);
        }
    }

    fn write_line(&mut self, raw: &[u8], out: &mut BytesMut) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let raw = if self.first_line {
            self.first_line = false;
            raw.strip_prefix(UTF8_BOM).unwrap_or(raw)
        } else {
            raw
        };

        out.put_slice(&self.rewrite_line(raw));
        out.put_u8(b'\n');
    }

    /// Rewrites one logical line, without its terminator. Lines that are not
    /// rewritten come back as the very same bytes.
    pub fn rewrite_line<'a>(&mut self, line: &'a [u8]) -> Cow<'a, [u8]> {
        let rewritten = if self.expecting_uri
            && !line.starts_with(b"#")
            && !line.trim_ascii().is_empty()
        {
            self.expecting_uri = false;
            match self.proxy_url_bytes(line) {
                Some(url) => Cow::Owned(url.into_bytes()),
                None => Cow::Borrowed(line),
            }
        } else {
            match URI_ATTRIBUTE.captures(line).and_then(|captures| captures.get(1)) {
                Some(value) => match self.proxy_url_bytes(value.as_bytes()) {
                    Some(url) => {
                        let mut spliced = Vec::with_capacity(line.len() + url.len());
                        spliced.extend_from_slice(&line[..value.start()]);
                        spliced.extend_from_slice(url.as_bytes());
                        spliced.extend_from_slice(&line[value.end()..]);
                        Cow::Owned(spliced)
                    }
                    None => Cow::Borrowed(line),
                },
                None => Cow::Borrowed(line),
            }
        };

        if line.starts_with(STREAM_INF_TAG.as_bytes()) || line.starts_with(EXTINF_TAG.as_bytes()) {
            self.expecting_uri = true;
        }

        rewritten
    }

    // References that are not valid UTF-8 cannot be URLs and stay as they are
    fn proxy_url_bytes(&self, reference: &[u8]) -> Option<String> {
        std::str::from_utf8(reference)
            .ok()
            .and_then(|reference| self.proxy_url(reference))
    }

    /// Proxy URL for a playlist reference, or `None` when it cannot be
    /// resolved to an absolute URL.
    pub fn proxy_url(&self, reference: &str) -> Option<String> {
        let absolute = match Url::parse(reference) {
            Ok(url) => url,
            Err(_) => self.base.join(reference).ok()?,
        };

        let mut url = format!(
            "{}/?url={}",
            self.proxy_authority,
            urlencoding::encode(absolute.as_str())
        );
        if let Some(code) = self.code.as_deref().filter(|code| !code.is_empty()) {
            url.push_str("&code=");
            url.push_str(code);
        }
        Some(url)
    }
}
