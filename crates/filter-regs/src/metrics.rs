use crate::{Error, Result};
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

#[derive(Clone)]
pub struct SessionMetrics {
    pub reads: IntCounter,
    pub unavailable: IntCounter,
    pub writes: IntCounter,
    pub commands: IntCounter,
    pub samples: IntCounter,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub session: SessionMetrics,
}

fn counter(name: &str, help: &str) -> Result<IntCounter> {
    IntCounter::new(name, help).map_err(|e| Error::Metrics(e.to_string()))
}

impl MetricsHub {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let session = SessionMetrics {
            reads: counter("uad_register_reads", "Register reads answered by the device")?,
            unavailable: counter(
                "uad_register_unavailable",
                "Register reads refused by the device",
            )?,
            writes: counter("uad_register_writes", "Register writes issued")?,
            commands: counter("uad_commands", "Control commands issued")?,
            samples: counter("uad_samples_driven", "Samples driven through the signal path")?,
        };
        let _ = registry.register(Box::new(session.reads.clone()));
        let _ = registry.register(Box::new(session.unavailable.clone()));
        let _ = registry.register(Box::new(session.writes.clone()));
        let _ = registry.register(Box::new(session.commands.clone()));
        let _ = registry.register(Box::new(session.samples.clone()));
        Ok(Self { registry, session })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_exposition_lists_counters() {
        let hub = MetricsHub::new().unwrap();
        hub.session.writes.inc_by(3);
        let text = hub.encode_text();
        assert!(text.contains("uad_register_writes 3"));
        assert!(text.contains("uad_samples_driven 0"));
    }
}
