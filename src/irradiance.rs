//! NASA POWER climatology lookup for average daily irradiance.
//!
//! One blocking GET per distinct rounded coordinate pair; responses are
//! memoized in a bounded cache for the lifetime of the client. No retries:
//! a failed fetch surfaces as an error and the caller decides what to do.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::types::SolError;

pub const NASA_POWER_BASE_URL: &str = "https://power.larc.nasa.gov";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const CACHE_CAPACITY: usize = 32;

/// Coordinates rounded to 4 decimal places (~11 m at the equator), scaled
/// to integers so they can key a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CoordKey {
    lon_e4: i64,
    lat_e4: i64,
}

impl CoordKey {
    fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon_e4: (lon * 1e4).round() as i64,
            lat_e4: (lat * 1e4).round() as i64,
        }
    }

    fn lon(&self) -> f64 {
        self.lon_e4 as f64 / 1e4
    }

    fn lat(&self) -> f64 {
        self.lat_e4 as f64 / 1e4
    }
}

/// Bounded irradiance memo keyed by rounded coordinates. Evicts the oldest
/// insertion once full; entries never expire otherwise.
#[derive(Debug)]
struct IrradianceCache {
    entries: HashMap<CoordKey, f64>,
    order: VecDeque<CoordKey>,
    capacity: usize,
}

impl IrradianceCache {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn get(&self, key: &CoordKey) -> Option<f64> {
        self.entries.get(key).copied()
    }

    fn insert(&mut self, key: CoordKey, value: f64) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, value);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key);
        self.entries.insert(key, value);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Blocking client for the POWER climatology point endpoint.
pub struct PowerClient {
    http: reqwest::blocking::Client,
    base_url: String,
    cache: IrradianceCache,
}

impl PowerClient {
    pub fn new() -> Result<Self, SolError> {
        Self::with_base_url(NASA_POWER_BASE_URL)
    }

    /// Point the client at a different host. Used by tests and air-gapped
    /// mirrors of the POWER service.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SolError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            cache: IrradianceCache::with_capacity(CACHE_CAPACITY),
        })
    }

    /// Annual-average daily irradiance (`ALLSKY_SFC_SW_DWN`, kWh/m²/day)
    /// at the given location.
    pub fn annual_irradiance(&mut self, lon: f64, lat: f64) -> Result<f64, SolError> {
        let key = CoordKey::new(lon, lat);
        if let Some(cached) = self.cache.get(&key) {
            debug!(lon = key.lon(), lat = key.lat(), "irradiance cache hit");
            return Ok(cached);
        }

        let url = format!("{}/api/temporal/climatology/point", self.base_url);
        let params = [
            ("parameters", "ALLSKY_SFC_SW_DWN".to_string()),
            ("community", "RE".to_string()),
            ("longitude", format!("{:.4}", key.lon())),
            ("latitude", format!("{:.4}", key.lat())),
            ("format", "JSON".to_string()),
        ];

        info!(lon = key.lon(), lat = key.lat(), "fetching POWER climatology");
        let body: Value = self
            .http
            .get(&url)
            .query(&params)
            .send()?
            .error_for_status()?
            .json()?;

        let annual = body
            .pointer("/properties/parameter/ALLSKY_SFC_SW_DWN/ANN")
            .and_then(Value::as_f64);

        match annual {
            Some(value) if value >= 0.0 => {
                self.cache.insert(key, value);
                Ok(value)
            }
            Some(value) => Err(SolError::DataQuality(format!(
                "POWER returned a negative annual irradiance: {value}"
            ))),
            None => Err(SolError::DataQuality(
                "annual irradiance missing from POWER response".to_string(),
            )),
        }
    }

    pub fn cached_locations(&self) -> usize {
        self.cache.len()
    }
}

/// Where the energy estimate gets its irradiance from: the POWER service,
/// or a fixed value supplied by the caller (offline runs, tests).
pub enum IrradianceSource {
    Fixed(f64),
    NasaPower(PowerClient),
}

impl IrradianceSource {
    pub fn annual_irradiance(&mut self, lon: f64, lat: f64) -> Result<f64, SolError> {
        match self {
            Self::Fixed(value) => Ok(*value),
            Self::NasaPower(client) => client.annual_irradiance(lon, lat),
        }
    }
}
