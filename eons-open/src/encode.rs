// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! URI component encoding matching the browser's `encodeURIComponent`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters escaped by `encodeURIComponent`: everything except ASCII
/// alphanumerics and `- _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-',)
    .remove(b'_',)
    .remove(b'.',)
    .remove(b'!',)
    .remove(b'~',)
    .remove(b'*',)
    .remove(b'\'',)
    .remove(b'(',)
    .remove(b')',);

/// Percent-encodes `input` as a single URI component.
///
/// # Examples
///
/// ```
/// use eons_open::encode_uri_component;
///
/// assert_eq!(
///     encode_uri_component("https://github.com/a/b"),
///     "https%3A%2F%2Fgithub.com%2Fa%2Fb"
/// );
/// ```
pub fn encode_uri_component(input: &str,) -> String
{
    utf8_percent_encode(input, URI_COMPONENT,).to_string()
}

/// Decodes percent-escapes in a URI component.
///
/// Malformed escapes are kept verbatim and invalid UTF-8 sequences are
/// replaced, so decoding never fails.
pub fn decode_uri_component(input: &str,) -> String
{
    percent_decode_str(input,).decode_utf8_lossy().into_owned()
}
