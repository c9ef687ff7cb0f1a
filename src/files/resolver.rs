//! # Resolución de Archivos
//! src/files/resolver.rs
//!
//! Mapea la URI de un [`Request`] a un archivo bajo el document root y
//! construye la [`Response`] correspondiente.
//!
//! ## Pasos
//!
//! 1. `/` se sirve como `/index.html` (query y fragmento se descartan)
//! 2. document root + URI, canonicalizado (resuelve `.`, `..` y symlinks)
//! 3. El path canónico debe quedar dentro del root canónico, si no → 404
//! 4. `open`: no existe → 404, sin permiso → 403, otro error → 500
//! 5. Sin bit de lectura para "otros" → 403
//! 6. Lectura completa; una lectura corta → 500
//!
//! La verificación de contención se hace siempre sobre el path
//! canónico, nunca sobre el string concatenado.

use super::mime::content_type_for;
use crate::http::{Request, Response, StatusCode};
use std::fs::{self, File, Metadata};
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Directorio base, ya canonicalizado, fuera del cual no se sirve nada
#[derive(Debug, Clone)]
pub struct DocumentRoot {
    root: PathBuf,
}

impl DocumentRoot {
    /// Canonicaliza `path` y verifica que sea un directorio
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let root = fs::canonicalize(path.as_ref())?;

        if !root.is_dir() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("document root {} is not a directory", root.display()),
            ));
        }

        Ok(Self { root })
    }

    /// Path canónico del root
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Construye la respuesta para un request
    ///
    /// Nunca falla: cualquier problema se traduce a 403/404/500.
    pub fn resolve(&self, request: &Request) -> Response {
        let result = self
            .locate(request.uri())
            .and_then(|path| Self::load(&path));

        let response = match result {
            Ok(response) => response,
            Err(status) => Response::error(status),
        };

        response.with_connection_close(request.connection_close())
    }

    /// Pasos 1 a 3: URI → path canónico contenido en el root
    pub fn locate(&self, uri: &str) -> Result<PathBuf, StatusCode> {
        let mapped = map_uri(uri);
        let candidate = self.root.join(mapped.trim_start_matches('/'));

        let canonical = fs::canonicalize(&candidate).map_err(|e| {
            debug!(uri, error = %e, "cannot canonicalize requested path");
            StatusCode::NotFound
        })?;

        if !canonical.starts_with(&self.root) {
            warn!(uri, resolved = %canonical.display(), "request escapes document root");
            return Err(StatusCode::NotFound);
        }

        Ok(canonical)
    }

    /// Pasos 4 a 6: abre, verifica permisos y lee el archivo completo
    fn load(path: &Path) -> Result<Response, StatusCode> {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StatusCode::NotFound,
            ErrorKind::PermissionDenied => StatusCode::Forbidden,
            _ => {
                error!(path = %path.display(), error = %e, "cannot open file");
                StatusCode::InternalServerError
            }
        })?;

        let metadata = file.metadata().map_err(|e| {
            error!(path = %path.display(), error = %e, "stat failed after open");
            StatusCode::InternalServerError
        })?;

        if metadata.is_dir() {
            debug!(path = %path.display(), "refusing to serve a directory");
            return Err(StatusCode::Forbidden);
        }

        if !world_readable(&metadata) {
            debug!(path = %path.display(), "file is not world-readable");
            return Err(StatusCode::Forbidden);
        }

        let last_modified = metadata
            .modified()
            .map(httpdate::fmt_http_date)
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "cannot read modification time");
                StatusCode::InternalServerError
            })?;

        let expected = usize::try_from(metadata.len()).map_err(|_| StatusCode::InternalServerError)?;

        let mut body = Vec::new();
        body.try_reserve_exact(expected).map_err(|e| {
            error!(path = %path.display(), size = expected, error = %e, "cannot allocate file buffer");
            StatusCode::InternalServerError
        })?;

        let read = file.read_to_end(&mut body).map_err(|e| {
            error!(path = %path.display(), error = %e, "file read failed");
            StatusCode::InternalServerError
        })?;

        if read != expected {
            error!(path = %path.display(), expected, read, "short file read");
            return Err(StatusCode::InternalServerError);
        }

        Ok(Response::file(body, content_type_for(path), Some(last_modified)))
    }
}

/// Arma la respuesta contra un document root dado como path
///
/// Variante sin estado de [`DocumentRoot::resolve`]; canonicaliza el root
/// en cada llamada. Un root inválido produce 500.
pub fn build_response(request: &Request, doc_root: &Path) -> Response {
    match DocumentRoot::new(doc_root) {
        Ok(root) => root.resolve(request),
        Err(e) => {
            error!(doc_root = %doc_root.display(), error = %e, "invalid document root");
            Response::error(StatusCode::InternalServerError)
                .with_connection_close(request.connection_close())
        }
    }
}

/// Descarta query/fragmento y mapea `/` a `/index.html`
fn map_uri(uri: &str) -> &str {
    let path = uri.split(|c: char| c == '?' || c == '#').next().unwrap_or("");
    if path == "/" {
        "/index.html"
    } else {
        path
    }
}

#[cfg(unix)]
fn world_readable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o004 != 0
}

#[cfg(not(unix))]
fn world_readable(_metadata: &Metadata) -> bool {
    true
}
