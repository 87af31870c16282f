// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use serde::{Deserialize, Serialize};

/// Default maximum resident byte total for the sample cache.
pub const DEFAULT_MAX_CACHE_BYTES: usize = 2 * 1024 * 1024;

/// Configuration for the sample cache.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct CacheConfig {
    /// Maximum resident byte total for decoded samples.
    #[serde(default = "default_max_bytes")]
    max_bytes: usize,
}

fn default_max_bytes() -> usize {
    DEFAULT_MAX_CACHE_BYTES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_CACHE_BYTES,
        }
    }
}

impl CacheConfig {
    /// Gets the configured budget in bytes.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cache_config() {
        let config: CacheConfig = serde_yml::from_str("max_bytes: 65536").unwrap();
        assert_eq!(config.max_bytes(), 65536);
    }

    #[test]
    fn test_defaults_apply() {
        let config: CacheConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(config.max_bytes(), DEFAULT_MAX_CACHE_BYTES);
        assert_eq!(CacheConfig::default().max_bytes(), DEFAULT_MAX_CACHE_BYTES);
    }
}
