// TWatch - Motion sensor interface
//
// What the motion driver needs from the accelerometer chip. The BMA423
// implementation lives in `drivers::bma423`; tests use a scripted fake.

// BMA423 feature interrupt status bits (INT_STATUS_0).
pub const INT_STEP_COUNTER: u8 = 0x02;
pub const INT_ACTIVITY: u8 = 0x04;
pub const INT_TILT: u8 = 0x08;
pub const INT_DOUBLE_CLICK: u8 = 0x20;
pub const INT_ANY_NO_MOTION: u8 = 0x40;
pub const INT_ERROR: u8 = 0x80;

/// Snapshot of the feature interrupt status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptStatus(pub u8);

impl InterruptStatus {
    pub fn is_double_click(&self) -> bool {
        self.0 & INT_DOUBLE_CLICK != 0
    }

    pub fn is_tilt(&self) -> bool {
        self.0 & INT_TILT != 0
    }

    pub fn is_step_counter(&self) -> bool {
        self.0 & INT_STEP_COUNTER != 0
    }
}

// ---------------------------------------------------------------------------
// Switchable features
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    StepCounter,
    DoubleClick,
    Tilt,
}

impl Feature {
    /// Persisted order (legacy binary layout and JSON field order).
    pub const ALL: [Feature; 3] = [Feature::StepCounter, Feature::DoubleClick, Feature::Tilt];

    pub fn key(&self) -> &'static str {
        match self {
            Self::StepCounter => "stepcounter",
            Self::DoubleClick => "doubleclick",
            Self::Tilt        => "tilt",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

// ---------------------------------------------------------------------------
// Axis remapping (display rotation)
// ---------------------------------------------------------------------------
/// Which physical axis feeds each logical axis, and whether it is inverted.
/// Axis indices: 0 = x, 1 = y, 2 = z. A sign of `false` inverts the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxesRemap {
    pub x_axis: u8,
    pub x_axis_sign: bool,
    pub y_axis: u8,
    pub y_axis_sign: bool,
    pub z_axis: u8,
    pub z_axis_sign: bool,
}

impl AxesRemap {
    /// Remap for a display rotated by `rotation` degrees. Only the four
    /// quadrants are supported; anything else yields `None`.
    pub fn for_rotation(rotation: u32) -> Option<Self> {
        let (x_axis, y_axis, y_axis_sign) = match rotation / 90 {
            0 => (0, 1, true),
            1 => (1, 0, false),
            2 => (0, 1, false),
            3 => (1, 0, true),
            _ => return None,
        };
        Some(Self {
            x_axis,
            x_axis_sign: true,
            y_axis,
            y_axis_sign,
            z_axis: 2,
            z_axis_sign: true,
        })
    }

    /// Feature-page encoding: byte 0 = x(1:0) xs(2) y(4:3) ys(5) z(7:6),
    /// byte 1 bit 0 = zs. The chip stores the sign bit as "inverted".
    pub fn to_register_bytes(&self) -> [u8; 2] {
        let inv = |sign: bool| u8::from(!sign);
        let b0 = (self.x_axis & 0x03)
            | inv(self.x_axis_sign) << 2
            | (self.y_axis & 0x03) << 3
            | inv(self.y_axis_sign) << 5
            | (self.z_axis & 0x03) << 6;
        [b0, inv(self.z_axis_sign)]
    }
}

/// Accelerometer chip with step counter, double-click (wakeup) and tilt
/// feature interrupts.
pub trait MotionSensor {
    fn begin(&mut self) -> anyhow::Result<()>;

    /// Read and latch the feature interrupt status.
    fn read_interrupt(&mut self) -> anyhow::Result<InterruptStatus>;

    /// Hardware step counter. Never reset by this firmware.
    fn step_counter(&mut self) -> anyhow::Result<u32>;

    fn enable_feature_interrupt(&mut self, feature: Feature, enable: bool) -> anyhow::Result<()>;

    fn set_remap_axes(&mut self, remap: &AxesRemap) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_flags() {
        let status = InterruptStatus(INT_DOUBLE_CLICK | INT_STEP_COUNTER);
        assert!(status.is_double_click());
        assert!(!status.is_tilt());
        assert!(status.is_step_counter());
        assert!(!InterruptStatus(INT_ACTIVITY | INT_ERROR).is_step_counter());
    }

    #[test]
    fn feature_keys_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_key(feature.key()), Some(feature));
        }
        assert_eq!(Feature::from_key("compass"), None);
    }

    #[test]
    fn rotation_quadrants() {
        let upright = AxesRemap::for_rotation(0).unwrap();
        assert_eq!((upright.x_axis, upright.y_axis, upright.z_axis), (0, 1, 2));
        assert!(upright.y_axis_sign);

        let quarter = AxesRemap::for_rotation(90).unwrap();
        assert_eq!((quarter.x_axis, quarter.y_axis), (1, 0));
        assert!(!quarter.y_axis_sign);

        let half = AxesRemap::for_rotation(180).unwrap();
        assert_eq!((half.x_axis, half.y_axis), (0, 1));
        assert!(!half.y_axis_sign);

        // 359 degrees still falls in the last quadrant.
        let three_quarter = AxesRemap::for_rotation(359).unwrap();
        assert_eq!((three_quarter.x_axis, three_quarter.y_axis), (1, 0));
        assert!(three_quarter.y_axis_sign);

        assert_eq!(AxesRemap::for_rotation(360), None);
    }

    #[test]
    fn remap_register_encoding() {
        assert_eq!(AxesRemap::for_rotation(0).unwrap().to_register_bytes(), [0b1000_1000, 0]);
        // x <- y, y <- x inverted.
        assert_eq!(AxesRemap::for_rotation(90).unwrap().to_register_bytes(), [0b1010_0001, 0]);
    }
}
