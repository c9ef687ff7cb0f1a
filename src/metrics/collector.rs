//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta y agrega métricas del servidor en tiempo real. Los workers y el
//! acceptor comparten un mismo collector (clonarlo comparte el estado).

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Máximo de latencias a guardar (para calcular percentiles)
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Rutas reportadas en el snapshot
const TOP_PATHS: usize = 10;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

/// Datos internos de métricas
#[derive(Default)]
struct MetricsData {
    /// Contador total de requests respondidos
    total_requests: u64,

    /// Requests por código de estado
    status_codes: BTreeMap<u16, u64>,

    /// Últimas latencias registradas (en microsegundos)
    latencies: VecDeque<u64>,

    /// Requests por URI
    requests_per_path: HashMap<String, u64>,

    /// Workers atendiendo una conexión en este momento
    active_workers: u64,

    /// Conexiones rechazadas con la cola llena
    rejected_connections: u64,

    /// Bodies que no entraron en el buffer
    truncated_bodies: u64,

    /// Requests mal formados (respondidos con 400)
    parse_errors: u64,

    /// Fallos de lectura/escritura en el socket
    transport_errors: u64,
}

impl MetricsCollector {
    /// Crea un nuevo collector de métricas
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(MAX_LATENCY_SAMPLES),
                ..MetricsData::default()
            })),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra un request respondido
    pub fn record_request(&self, path: &str, status_code: u16, latency: Duration) {
        let mut data = self.lock();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCY_SAMPLES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        *data.requests_per_path.entry(path.to_string()).or_insert(0) += 1;
    }

    /// Registra una conexión rechazada (cola llena)
    pub fn record_rejected(&self) {
        self.lock().rejected_connections += 1;
    }

    /// Registra un body truncado
    pub fn record_truncated_body(&self) {
        self.lock().truncated_bodies += 1;
    }

    /// Registra un request mal formado
    pub fn record_parse_error(&self) {
        self.lock().parse_errors += 1;
    }

    /// Registra un error de transporte
    pub fn record_transport_error(&self) {
        self.lock().transport_errors += 1;
    }

    /// Incrementa el contador de workers activos
    pub fn increment_active_workers(&self) {
        self.lock().active_workers += 1;
    }

    /// Decrementa el contador de workers activos
    pub fn decrement_active_workers(&self) {
        let mut data = self.lock();
        data.active_workers = data.active_workers.saturating_sub(1);
    }

    /// Marca un worker como activo hasta que se descarte el guard
    pub fn track_active_worker(&self) -> ActiveWorkerGuard {
        self.increment_active_workers();
        ActiveWorkerGuard {
            collector: self.clone(),
        }
    }

    /// Obtiene el número de workers activos
    pub fn active_workers(&self) -> u64 {
        self.lock().active_workers
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.lock();

        let mut paths: Vec<_> = data.requests_per_path.iter().collect();
        paths.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top_paths = paths
            .into_iter()
            .take(TOP_PATHS)
            .map(|(path, count)| PathCount {
                path: path.clone(),
                count: *count,
            })
            .collect();

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            total_requests: data.total_requests,
            active_workers: data.active_workers,
            status_codes: data.status_codes.clone(),
            rejected_connections: data.rejected_connections,
            truncated_bodies: data.truncated_bodies,
            parse_errors: data.parse_errors,
            transport_errors: data.transport_errors,
            top_paths,
            latency: LatencySummary::from_samples(&data.latencies),
        }
    }

    /// Obtiene las métricas actuales en formato JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrementa los workers activos al salir de scope (incluso con panic)
pub struct ActiveWorkerGuard {
    collector: MetricsCollector,
}

impl Drop for ActiveWorkerGuard {
    fn drop(&mut self) {
        self.collector.decrement_active_workers();
    }
}

/// Snapshot de métricas (serializable)
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub active_workers: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub rejected_connections: u64,
    pub truncated_bodies: u64,
    pub parse_errors: u64,
    pub transport_errors: u64,
    pub top_paths: Vec<PathCount>,
    pub latency: LatencySummary,
}

impl MetricsSnapshot {
    /// Requests respondidos con un código dado
    pub fn count_for(&self, status_code: u16) -> u64 {
        self.status_codes.get(&status_code).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

/// Percentiles de latencia en microsegundos
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub avg_us: u64,
    pub samples: usize,
}

impl LatencySummary {
    fn from_samples(latencies: &VecDeque<u64>) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        let mut sorted: Vec<u64> = latencies.iter().copied().collect();
        sorted.sort_unstable();

        let len = sorted.len();
        let sum: u64 = sorted.iter().sum();

        Self {
            p50_us: sorted[len * 50 / 100],
            p95_us: sorted[len * 95 / 100],
            p99_us: sorted[len * 99 / 100],
            avg_us: sum / len as u64,
            samples: len,
        }
    }
}
