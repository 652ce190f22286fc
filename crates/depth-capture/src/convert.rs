use crate::{DepthFrame, DisparityFrame, FrameConverter, Result, StereoCalibration};

/// Software depth-to-disparity transform.
///
/// Each sample becomes `focal_px * baseline_mm / depth_mm`, so disparity is in
/// pixels and proportional to inverse depth. Invalid (non-positive) depth
/// samples produce zero disparity.
#[derive(Clone, Debug, Default)]
pub struct InverseDepthConverter {
    fallback: StereoCalibration,
}

impl InverseDepthConverter {
    /// Use `fallback` for frames that arrive without calibration metadata.
    pub fn new(fallback: StereoCalibration) -> Self {
        Self { fallback }
    }
}

impl FrameConverter for InverseDepthConverter {
    fn to_disparity(&mut self, depth: &DepthFrame) -> Result<DisparityFrame> {
        let calib = depth.calibration.unwrap_or(self.fallback);
        let numerator = calib.focal_px * calib.baseline_mm;
        let data = depth
            .data
            .iter()
            .map(|&raw| {
                if raw <= 0 {
                    0.0
                } else {
                    numerator / (f32::from(raw) * calib.depth_units_mm)
                }
            })
            .collect();
        Ok(DisparityFrame {
            width: depth.width,
            height: depth.height,
            data,
            baseline_mm: calib.baseline_mm,
            ts: depth.ts,
        })
    }
}
