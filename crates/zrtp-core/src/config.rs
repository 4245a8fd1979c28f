//! ZRTP configuration
//!
//! Holds the offered algorithm lists (in preference order), the Hello flag
//! bits and the retransmission timer profiles. Configuration can be built
//! in code or loaded from YAML:
//!
//! ```yaml
//! client_id: "RVOIP ZRTP 1.0"
//! hash: [S384, S256]
//! cipher: [2FS3, AES3, 2FS1, AES1]
//! auth_length: [SK32, SK64, HS32, HS80]
//! pub_key: [EC25, DH3k, EC38, Mult]
//! sas: ["B32 "]
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::ConfigError;
use crate::timer::TimerProfile;

/// Environment variable naming a YAML configuration file
pub const CONFIG_ENV_VAR: &str = "RVOIP_ZRTP_CONFIG";

/// Maximum number of entries per algorithm list (4-bit count on the wire)
pub const MAX_ALGORITHMS: usize = 15;

/// Length of the client identifier field in Hello
pub const CLIENT_ID_LEN: usize = 16;

/// Four-character algorithm identifier as carried on the wire
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlgorithmId(pub [u8; 4]);

impl AlgorithmId {
    pub const fn new(id: &[u8; 4]) -> Self {
        Self(*id)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Debug for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AlgorithmId({:?})", self.as_str())
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AlgorithmId {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes = value.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(ConfigError::InvalidAlgorithm(value.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl TryFrom<String> for AlgorithmId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AlgorithmId::try_from(value.as_str())
    }
}

impl From<AlgorithmId> for String {
    fn from(id: AlgorithmId) -> Self {
        id.as_str().to_string()
    }
}

/// Algorithm categories, in Hello list order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmCategory {
    Hash,
    Cipher,
    AuthLength,
    PubKey,
    Sas,
}

impl AlgorithmCategory {
    /// All categories in the order their lists appear in Hello
    pub const ALL: [AlgorithmCategory; 5] = [
        AlgorithmCategory::Hash,
        AlgorithmCategory::Cipher,
        AlgorithmCategory::AuthLength,
        AlgorithmCategory::PubKey,
        AlgorithmCategory::Sas,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmCategory::Hash => "hash",
            AlgorithmCategory::Cipher => "cipher",
            AlgorithmCategory::AuthLength => "auth length",
            AlgorithmCategory::PubKey => "public key",
            AlgorithmCategory::Sas => "SAS",
        }
    }

    /// Identifiers this implementation knows for the category
    pub fn known(&self) -> &'static [AlgorithmId] {
        match self {
            AlgorithmCategory::Hash => &KNOWN_HASHES,
            AlgorithmCategory::Cipher => &KNOWN_CIPHERS,
            AlgorithmCategory::AuthLength => &KNOWN_AUTH_LENGTHS,
            AlgorithmCategory::PubKey => &KNOWN_PUB_KEYS,
            AlgorithmCategory::Sas => &KNOWN_SAS_TYPES,
        }
    }

    pub fn is_known(&self, id: &AlgorithmId) -> bool {
        self.known().contains(id)
    }
}

const KNOWN_HASHES: [AlgorithmId; 4] = [
    AlgorithmId::new(b"S256"),
    AlgorithmId::new(b"S384"),
    AlgorithmId::new(b"N256"),
    AlgorithmId::new(b"N384"),
];

const KNOWN_CIPHERS: [AlgorithmId; 6] = [
    AlgorithmId::new(b"AES1"),
    AlgorithmId::new(b"AES2"),
    AlgorithmId::new(b"AES3"),
    AlgorithmId::new(b"2FS1"),
    AlgorithmId::new(b"2FS2"),
    AlgorithmId::new(b"2FS3"),
];

const KNOWN_AUTH_LENGTHS: [AlgorithmId; 4] = [
    AlgorithmId::new(b"HS32"),
    AlgorithmId::new(b"HS80"),
    AlgorithmId::new(b"SK32"),
    AlgorithmId::new(b"SK64"),
];

const KNOWN_PUB_KEYS: [AlgorithmId; 8] = [
    AlgorithmId::new(b"DH2k"),
    AlgorithmId::new(b"DH3k"),
    AlgorithmId::new(b"EC25"),
    AlgorithmId::new(b"EC38"),
    AlgorithmId::new(b"EC52"),
    AlgorithmId::new(b"E255"),
    AlgorithmId::new(b"Prsh"),
    AlgorithmId::new(b"Mult"),
];

const KNOWN_SAS_TYPES: [AlgorithmId; 2] = [
    AlgorithmId::new(b"B32 "),
    AlgorithmId::new(b"B256"),
];

/// Retransmission timer profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "TimerProfile::t1")]
    pub t1: TimerProfile,
    #[serde(default = "TimerProfile::t2")]
    pub t2: TimerProfile,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            t1: TimerProfile::t1(),
            t2: TimerProfile::t2(),
        }
    }
}

/// ZRTP engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZrtpConfig {
    /// Client identifier sent in Hello (at most 16 bytes)
    pub client_id: String,

    /// Hash algorithms in preference order
    pub hash: Vec<AlgorithmId>,

    /// Symmetric ciphers in preference order
    pub cipher: Vec<AlgorithmId>,

    /// SRTP authentication tag lengths in preference order
    pub auth_length: Vec<AlgorithmId>,

    /// Key agreement methods in preference order
    pub pub_key: Vec<AlgorithmId>,

    /// SAS rendering types in preference order
    pub sas: Vec<AlgorithmId>,

    /// Advertise the ability to sign the SAS (Hello `S` flag)
    pub sas_signing: bool,

    /// Act as a trusted MitM / PBX (Hello `M` flag)
    pub mitm_mode: bool,

    /// Never initiate with a Commit (Hello `P` flag)
    pub passive: bool,

    pub timers: TimerConfig,
}

impl Default for ZrtpConfig {
    fn default() -> Self {
        Self {
            client_id: "RVOIP ZRTP 1.0".to_string(),
            hash: vec![AlgorithmId::new(b"S384"), AlgorithmId::new(b"S256")],
            cipher: vec![
                AlgorithmId::new(b"2FS3"),
                AlgorithmId::new(b"AES3"),
                AlgorithmId::new(b"2FS1"),
                AlgorithmId::new(b"AES1"),
            ],
            auth_length: vec![
                AlgorithmId::new(b"SK32"),
                AlgorithmId::new(b"SK64"),
                AlgorithmId::new(b"HS32"),
                AlgorithmId::new(b"HS80"),
            ],
            pub_key: vec![
                AlgorithmId::new(b"EC25"),
                AlgorithmId::new(b"DH3k"),
                AlgorithmId::new(b"EC38"),
                AlgorithmId::new(b"Mult"),
            ],
            sas: vec![AlgorithmId::new(b"B32 ")],
            sas_signing: false,
            mitm_mode: false,
            passive: false,
            timers: TimerConfig::default(),
        }
    }
}

impl ZrtpConfig {
    /// Algorithm list for a category
    pub fn algorithms(&self, category: AlgorithmCategory) -> &[AlgorithmId] {
        match category {
            AlgorithmCategory::Hash => &self.hash,
            AlgorithmCategory::Cipher => &self.cipher,
            AlgorithmCategory::AuthLength => &self.auth_length,
            AlgorithmCategory::PubKey => &self.pub_key,
            AlgorithmCategory::Sas => &self.sas,
        }
    }

    /// Client id padded with spaces to the 16-byte wire field
    pub fn client_id_bytes(&self) -> [u8; CLIENT_ID_LEN] {
        let mut out = [b' '; CLIENT_ID_LEN];
        let raw = self.client_id.as_bytes();
        let len = raw.len().min(CLIENT_ID_LEN);
        out[..len].copy_from_slice(&raw[..len]);
        out
    }

    /// Check list sizes, identifiers and timer profiles
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.len() > CLIENT_ID_LEN {
            return Err(ConfigError::ClientIdTooLong(self.client_id.len()));
        }

        for category in AlgorithmCategory::ALL {
            let list = self.algorithms(category);
            if list.len() > MAX_ALGORITHMS {
                return Err(ConfigError::TooManyAlgorithms {
                    category: category.name(),
                    count: list.len(),
                });
            }
            if list.is_empty() {
                return Err(ConfigError::EmptyCategory(category.name()));
            }
            if let Some(unknown) = list.iter().find(|id| !category.is_known(id)) {
                return Err(ConfigError::InvalidAlgorithm(format!(
                    "{} is not a {} algorithm",
                    unknown,
                    category.name()
                )));
            }
        }

        for (name, profile) in [("t1", &self.timers.t1), ("t2", &self.timers.t2)] {
            if profile.start_ms == 0 || profile.cap_ms < profile.start_ms {
                return Err(ConfigError::InvalidTimer(format!(
                    "{}: start {} ms, cap {} ms",
                    name, profile.start_ms, profile.cap_ms
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: ZrtpConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration with priority:
    /// 1. `config_path` if given
    /// 2. the file named by `RVOIP_ZRTP_CONFIG`
    /// 3. built-in defaults
    pub fn load(config_path: Option<&str>) -> Self {
        if let Some(path) = config_path {
            info!("Loading ZRTP config from path: {}", path);
            match Self::from_yaml_file(path) {
                Ok(config) => return config,
                Err(e) => warn!("Failed to load ZRTP config from {}: {}", path, e),
            }
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            info!("Loading ZRTP config from environment variable: {}", env_path);
            match Self::from_yaml_file(&env_path) {
                Ok(config) => return config,
                Err(e) => error!("Failed to load ZRTP config from {}: {}", env_path, e),
            }
        }

        info!("Using default ZRTP config");
        Self::default()
    }
}
