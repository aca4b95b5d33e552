use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct DecodeOutcome {
    pub roots: Vec<Value>,
    pub skipped_lines: usize,
}

impl DecodeOutcome {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

pub fn decode(raw: &str) -> DecodeOutcome {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return DecodeOutcome {
            roots: vec![value],
            skipped_lines: 0,
        };
    }

    let mut roots = Vec::new();
    let mut skipped_lines = 0usize;
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => roots.push(value),
            Err(_) => skipped_lines = skipped_lines.saturating_add(1),
        }
    }

    DecodeOutcome {
        roots,
        skipped_lines,
    }
}
