//! Common media types for [`content_type`](crate::middleware::content_type).

use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MediaType {
    ApplicationFormUrlEncoded, // application/x-www-form-urlencoded
    ApplicationJavascript,     // application/javascript
    ApplicationJson,           // application/json
    ApplicationOctetStream,    // application/octet-stream
    ApplicationXml,            // application/xml
    ImageGif,                  // image/gif
    ImageJpeg,                 // image/jpeg
    ImagePng,                  // image/png
    MultipartFormData,         // multipart/form-data
    TextCsv,                   // text/csv
    TextHtml,                  // text/html
    TextPlain,                 // text/plain
    TextXml,                   // text/xml
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApplicationFormUrlEncoded => "application/x-www-form-urlencoded",
            Self::ApplicationJavascript     => "application/javascript",
            Self::ApplicationJson           => "application/json",
            Self::ApplicationOctetStream    => "application/octet-stream",
            Self::ApplicationXml            => "application/xml",
            Self::ImageGif                  => "image/gif",
            Self::ImageJpeg                 => "image/jpeg",
            Self::ImagePng                  => "image/png",
            Self::MultipartFormData         => "multipart/form-data",
            Self::TextCsv                   => "text/csv",
            Self::TextHtml                  => "text/html",
            Self::TextPlain                 => "text/plain",
            Self::TextXml                   => "text/xml",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
