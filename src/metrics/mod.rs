//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Este módulo implementa la recolección y agregación de métricas del servidor:
//! - Contadores de requests por código de estado
//! - Latencias (p50, p95, p99)
//! - Workers ocupados
//! - Conexiones rechazadas, bodies truncados y errores de protocolo/transporte

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};
