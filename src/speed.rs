//! Link speed descriptors as printed by ibnetdiscover (`4xEDR`, `1xSDR`, ...)
//! and their conversion to an edge weight.
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeedError {
    #[error("malformed link speed {0:?}, expected <lanes>x<encoding>")]
    Malformed(String),
    #[error("invalid lane count {0:?}")]
    InvalidLaneCount(String),
    #[error("unsupported link speed encoding {0:?}")]
    UnsupportedEncoding(String),
}

/// Per-lane signaling scheme.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Encoding {
    Sdr,
    Ddr,
    Qdr,
    Fdr10,
    Fdr,
    Edr,
    Hdr,
    Ndr,
    Xdr,
}

impl Encoding {
    /// Signaling rate of a single lane, in Gb/s.
    pub fn lane_rate(self) -> f64 {
        match self {
            Encoding::Sdr => 2.0,
            Encoding::Ddr => 4.0,
            Encoding::Qdr => 8.0,
            Encoding::Fdr10 => 10.0,
            Encoding::Fdr => 13.64,
            Encoding::Edr => 25.0,
            Encoding::Hdr => 50.0,
            Encoding::Ndr => 100.0,
            Encoding::Xdr => 200.0,
        }
    }
}

impl FromStr for Encoding {
    type Err = SpeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SDR" => Ok(Encoding::Sdr),
            "DDR" => Ok(Encoding::Ddr),
            "QDR" => Ok(Encoding::Qdr),
            "FDR10" => Ok(Encoding::Fdr10),
            "FDR" => Ok(Encoding::Fdr),
            "EDR" => Ok(Encoding::Edr),
            "HDR" => Ok(Encoding::Hdr),
            "NDR" => Ok(Encoding::Ndr),
            "XDR" => Ok(Encoding::Xdr),
            _ => Err(SpeedError::UnsupportedEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Sdr => "SDR",
            Encoding::Ddr => "DDR",
            Encoding::Qdr => "QDR",
            Encoding::Fdr10 => "FDR10",
            Encoding::Fdr => "FDR",
            Encoding::Edr => "EDR",
            Encoding::Hdr => "HDR",
            Encoding::Ndr => "NDR",
            Encoding::Xdr => "XDR",
        };
        f.write_str(name)
    }
}

/// Width and encoding of one physical link.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LinkSpeed {
    pub lanes: u32,
    pub encoding: Encoding,
}

impl LinkSpeed {
    /// Aggregate bandwidth of the link, used as edge weight.
    pub fn weight(&self) -> f64 {
        f64::from(self.lanes) * self.encoding.lane_rate()
    }
}

impl FromStr for LinkSpeed {
    type Err = SpeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lanes, encoding) = s
            .split_once('x')
            .ok_or_else(|| SpeedError::Malformed(s.to_string()))?;

        let lanes = match lanes.parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => return Err(SpeedError::InvalidLaneCount(lanes.to_string())),
        };

        Ok(LinkSpeed {
            lanes,
            encoding: encoding.parse()?,
        })
    }
}

impl fmt::Display for LinkSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.lanes, self.encoding)
    }
}

/// Convert a speed descriptor such as `4xEDR` to an edge weight.
pub fn speed_to_weight(descriptor: &str) -> Result<f64, SpeedError> {
    descriptor.parse::<LinkSpeed>().map(|speed| speed.weight())
}
