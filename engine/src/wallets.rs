use std::path::Path;

use anyhow::{bail, Context, Result};

/// Reads one hex private key per line. Blank lines and `#` comments are
/// ignored; `max_wallets == 0` keeps every key.
pub fn load_private_keys(path: impl AsRef<Path>, max_wallets: usize) -> Result<Vec<String>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read private keys from {}", path.display()))?;
    let keys = parse_private_keys(&raw, max_wallets)?;
    if keys.is_empty() {
        bail!("No private keys found in {}", path.display());
    }
    Ok(keys)
}

pub fn parse_private_keys(raw: &str, max_wallets: usize) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let hex = line.strip_prefix("0x").unwrap_or(line);
        // Never echo the key itself.
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("Line {} is not a 32-byte hex private key", idx + 1);
        }
        keys.push(format!("0x{}", hex));
    }
    if max_wallets > 0 {
        keys.truncate(max_wallets);
    }
    Ok(keys)
}

/// Short form for logs: `0x1234…abcd`.
pub fn short_address(address: &alloy_primitives::Address) -> String {
    let full = address.to_string();
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}
