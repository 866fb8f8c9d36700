//! Fixed minimal HTTP/1.1 error responses for rejection paths.
//!
//! The dispatcher never rewrites or proxies real HTTP responses; these are
//! the only three responses the core ever produces itself, all on
//! admission-failure paths.

/// The closed set of rejection responses the dispatcher can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorResponse {
    /// The load shedder refused admission before a backend was chosen.
    Shed,
    /// No healthy backend was available to serve the connection.
    Overloaded,
    /// A backend was chosen but the dial or relay subsequently failed.
    Internal,
}

impl ErrorResponse {
    fn status_line(self) -> &'static str {
        match self {
            ErrorResponse::Shed | ErrorResponse::Overloaded => "503 Service Unavailable",
            ErrorResponse::Internal => "500 Internal Server Error",
        }
    }

    fn body(self) -> &'static str {
        match self {
            ErrorResponse::Shed => {
                "The server is currently experiencing high load, please try again later."
            }
            ErrorResponse::Overloaded => {
                "No healthy servers available, please try again later."
            }
            ErrorResponse::Internal => "Internal Server Error",
        }
    }

    /// Render the complete, well-formed HTTP/1.1 response: status line,
    /// `Content-Length`, a single blank line, then the body.
    pub fn render(self) -> Vec<u8> {
        let body = self.body();
        format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status_line(),
            body.len(),
            body
        )
        .into_bytes()
    }
}
