//! # Static Server
//! src/lib.rs
//!
//! Servidor HTTP/1.1 concurrente de archivos estáticos: un acceptor, una
//! cola acotada productor/consumidor y un pool fijo de workers.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: lectura, parsing y escritura del protocolo HTTP/1.1
//! - `files`: resolución de URIs contra el document root y Content-Type
//! - `pool`: cola acotada y pool de workers
//! - `server`: acceptor, pipeline por conexión y shutdown
//! - `metrics`: recolección de métricas y observabilidad
//! - `config`: configuración por CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use static_server::config::Config;
//! use static_server::server::Server;
//!
//! let config = Config::default();
//! let server = Server::new(config).expect("Error al iniciar servidor");
//! let handle = server.shutdown_handle();
//! std::thread::spawn(move || server.run());
//! // ...
//! handle.shutdown();
//! ```

pub mod config;
pub mod files;
pub mod http;
pub mod metrics;
pub mod pool;
pub mod server;
