//! Tabla fija extensión → Content-Type.

use std::path::Path;

/// Content-Type para extensiones desconocidas o archivos sin extensión
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const CONTENT_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
];

/// Obtiene el Content-Type a partir de la extensión (sin distinguir mayúsculas)
///
/// # Ejemplo
/// ```
/// use std::path::Path;
/// use static_server::files::content_type_for;
///
/// assert_eq!(content_type_for(Path::new("index.html")), "text/html");
/// assert_eq!(content_type_for(Path::new("notes.txt")), "application/octet-stream");
/// ```
pub fn content_type_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| {
            CONTENT_TYPES
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(ext))
                .map(|(_, content_type)| *content_type)
        })
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
