//! # Módulo HTTP
//!
//! Implementa el subconjunto de HTTP/1.1 que necesita el servidor de
//! archivos, sin librerías de alto nivel:
//!
//! - Lectura del request completo desde el socket
//! - Parsing de request line y headers (`Host`, `Content-Length`, `Connection`)
//! - Construcción y escritura de responses
//!
//! ## Alcance
//!
//! - Una sola request por conexión (sin keep-alive ni pipelining)
//! - Sin chunked transfer encoding
//!
//! ### Formato de Request
//!
//! ```text
//! GET /index.html HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Server: static_server/0.1.0\r\n
//! Last-Modified: Sun, 06 Nov 1994 08:49:37 GMT\r\n
//! Content-Length: 13\r\n
//! Content-Type: text/html\r\n
//! \r\n
//! <h1>hola</h1>
//! ```

pub mod reader;    // Lectura del request desde el socket
pub mod request;   // Parsing de requests
pub mod response;  // Respuestas estructuradas
pub mod status;    // Códigos de estado HTTP
pub mod writer;    // Serialización de responses

pub use reader::{read_request, ReadError};
pub use request::{ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
pub use writer::{write_response, WriteError};
