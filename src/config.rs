//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor con soporte completo
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./static_server --port 8080 \
//!   --doc-root ./www \
//!   --workers 8 \
//!   --queue-capacity 64 \
//!   --on-full reject
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 DOC_ROOT=/srv/www ./static_server
//! ```

use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};

/// Tamaño mínimo aceptado para `--max-request-size`
pub const MIN_REQUEST_SIZE: usize = 64;

/// Qué hacer con una conexión nueva cuando la cola está llena
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FullQueuePolicy {
    /// El acceptor espera a que se libere un slot
    Block,

    /// Se responde 503 y se cierra la conexión
    Reject,
}

impl fmt::Display for FullQueuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FullQueuePolicy::Block => write!(f, "block"),
            FullQueuePolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Configuración del servidor de archivos estáticos
#[derive(Debug, Clone, Parser)]
#[command(name = "static_server")]
#[command(about = "Servidor HTTP/1.1 concurrente de archivos estáticos")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio desde el que se sirven los archivos
    #[arg(short, long = "doc-root", default_value = "./www", env = "DOC_ROOT")]
    pub doc_root: PathBuf,

    // === Workers y cola ===

    /// Número de workers
    #[arg(short, long, default_value = "8", env = "WORKERS")]
    pub workers: usize,

    /// Capacidad máxima de la cola de conexiones
    #[arg(long = "queue-capacity", default_value = "64", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Política cuando la cola está llena
    #[arg(long = "on-full", value_enum, default_value = "block", env = "ON_FULL")]
    pub on_full: FullQueuePolicy,

    // === Timeouts y límites ===

    /// Timeout de lectura/escritura del socket en milisegundos
    #[arg(long = "recv-timeout-ms", default_value = "5000", env = "RECV_TIMEOUT_MS")]
    pub recv_timeout_ms: u64,

    /// Tamaño máximo de un request (headers + body) en bytes
    #[arg(long = "max-request-size", default_value = "8192", env = "MAX_REQUEST_SIZE")]
    pub max_request_size: usize,

    /// Tiempo máximo de espera por los workers al apagar, en milisegundos
    #[arg(long = "shutdown-timeout-ms", default_value = "2000", env = "SHUTDOWN_TIMEOUT_MS")]
    pub shutdown_timeout_ms: u64,

    // === Logging ===

    /// Nivel máximo de log (trace, debug, info, warn, error)
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: Level,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    ///
    /// # Ejemplo
    /// ```no_run
    /// use static_server::config::Config;
    ///
    /// let config = Config::new();
    /// println!("Server listening on {}", config.address());
    /// ```
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use static_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout aplicado a cada socket aceptado
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    /// Espera máxima por los workers durante el shutdown
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Workers must be >= 1".to_string());
        }

        if self.queue_capacity == 0 {
            return Err("Queue capacity must be >= 1".to_string());
        }

        if self.recv_timeout_ms == 0 {
            return Err("Receive timeout must be > 0".to_string());
        }
        if self.shutdown_timeout_ms == 0 {
            return Err("Shutdown timeout must be > 0".to_string());
        }

        if self.max_request_size < MIN_REQUEST_SIZE {
            return Err(format!(
                "Max request size must be >= {} bytes",
                MIN_REQUEST_SIZE
            ));
        }

        Ok(())
    }

    /// Loguea un resumen de la configuración
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            doc_root = %self.doc_root.display(),
            "network"
        );
        info!(
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            on_full = %self.on_full,
            "worker pool"
        );
        info!(
            recv_timeout_ms = self.recv_timeout_ms,
            max_request_size = self.max_request_size,
            shutdown_timeout_ms = self.shutdown_timeout_ms,
            log_level = %self.log_level,
            "limits"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            doc_root: PathBuf::from("./www"),
            workers: 8,
            queue_capacity: 64,
            on_full: FullQueuePolicy::Block,
            recv_timeout_ms: 5_000,
            max_request_size: 8192,
            shutdown_timeout_ms: 2_000,
            log_level: Level::INFO,
        }
    }
}
