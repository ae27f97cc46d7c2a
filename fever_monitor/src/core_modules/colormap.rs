// THEORY:
// The `colormap` module is the palette table behind the colorizer. A thermal
// frame is a single channel of readings; people read it far more easily when
// intensity is mapped to hue. Each `Colormap` is described by a handful of
// evenly spaced anchor colors, and a 256-entry lookup table is produced by
// linear interpolation between them.
//
// The table has a fixed size and a fixed order. Settings store palettes by
// name while the worker addresses them by index, so both lookups live here and
// every index is validated against `Colormap::ALL`.

use crate::error::{Error, Result};

/// Number of entries in the palette table.
pub const COLORMAP_COUNT: usize = 22;

/// A 256-entry RGB lookup table indexed by 8-bit intensity.
pub type Lut = [[u8; 3]; 256];

/// The named palettes, in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Colormap {
    Autumn,
    Jet,
    Bone,
    Winter,
    Rainbow,
    Ocean,
    Summer,
    Spring,
    Cool,
    Hsv,
    Pink,
    Hot,
    Parula,
    Magma,
    Inferno,
    Plasma,
    Viridis,
    Cividis,
    Twilight,
    TwilightShifted,
    Turbo,
    DeepGreen,
}

impl Colormap {
    pub const ALL: [Colormap; COLORMAP_COUNT] = [
        Colormap::Autumn,
        Colormap::Jet,
        Colormap::Bone,
        Colormap::Winter,
        Colormap::Rainbow,
        Colormap::Ocean,
        Colormap::Summer,
        Colormap::Spring,
        Colormap::Cool,
        Colormap::Hsv,
        Colormap::Pink,
        Colormap::Hot,
        Colormap::Parula,
        Colormap::Magma,
        Colormap::Inferno,
        Colormap::Plasma,
        Colormap::Viridis,
        Colormap::Cividis,
        Colormap::Twilight,
        Colormap::TwilightShifted,
        Colormap::Turbo,
        Colormap::DeepGreen,
    ];

    /// Looks up a palette by its position in the table.
    pub fn from_index(index: i32) -> Result<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "colormap_index value '{index}' is invalid. Must be an integer in range 0 to {}.",
                    COLORMAP_COUNT - 1
                ))
            })
    }

    /// Looks up a palette by its upper-case name, ignoring case.
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown colormap name '{name}'")))
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Autumn => "AUTUMN",
            Colormap::Jet => "JET",
            Colormap::Bone => "BONE",
            Colormap::Winter => "WINTER",
            Colormap::Rainbow => "RAINBOW",
            Colormap::Ocean => "OCEAN",
            Colormap::Summer => "SUMMER",
            Colormap::Spring => "SPRING",
            Colormap::Cool => "COOL",
            Colormap::Hsv => "HSV",
            Colormap::Pink => "PINK",
            Colormap::Hot => "HOT",
            Colormap::Parula => "PARULA",
            Colormap::Magma => "MAGMA",
            Colormap::Inferno => "INFERNO",
            Colormap::Plasma => "PLASMA",
            Colormap::Viridis => "VIRIDIS",
            Colormap::Cividis => "CIVIDIS",
            Colormap::Twilight => "TWILIGHT",
            Colormap::TwilightShifted => "TWILIGHT_SHIFTED",
            Colormap::Turbo => "TURBO",
            Colormap::DeepGreen => "DEEPGREEN",
        }
    }

    /// Evenly spaced anchor colors, low intensity first.
    fn anchors(self) -> &'static [[u8; 3]] {
        match self {
            Colormap::Autumn => &[[255, 0, 0], [255, 255, 0]],
            Colormap::Jet => &[
                [0, 0, 128],
                [0, 0, 255],
                [0, 128, 255],
                [0, 255, 255],
                [128, 255, 128],
                [255, 255, 0],
                [255, 128, 0],
                [255, 0, 0],
                [128, 0, 0],
            ],
            Colormap::Bone => &[[0, 0, 0], [84, 84, 116], [167, 199, 199], [255, 255, 255]],
            Colormap::Winter => &[[0, 0, 255], [0, 255, 128]],
            Colormap::Rainbow => &[
                [255, 0, 0],
                [255, 255, 0],
                [0, 255, 0],
                [0, 255, 255],
                [0, 0, 255],
                [128, 0, 255],
            ],
            Colormap::Ocean => &[[0, 128, 0], [0, 0, 128], [0, 128, 255], [255, 255, 255]],
            Colormap::Summer => &[[0, 128, 102], [255, 255, 102]],
            Colormap::Spring => &[[255, 0, 255], [255, 255, 0]],
            Colormap::Cool => &[[0, 255, 255], [255, 0, 255]],
            Colormap::Hsv => &[
                [255, 0, 0],
                [255, 255, 0],
                [0, 255, 0],
                [0, 255, 255],
                [0, 0, 255],
                [255, 0, 255],
                [255, 0, 0],
            ],
            Colormap::Pink => &[[30, 0, 0], [190, 128, 128], [231, 231, 175], [255, 255, 255]],
            Colormap::Hot => &[[0, 0, 0], [255, 0, 0], [255, 255, 0], [255, 255, 255]],
            Colormap::Parula => &[
                [53, 42, 135],
                [15, 92, 221],
                [18, 125, 216],
                [7, 156, 207],
                [21, 177, 180],
                [89, 189, 140],
                [165, 190, 107],
                [225, 185, 82],
                [252, 206, 46],
                [249, 251, 14],
            ],
            Colormap::Magma => &[
                [0, 0, 4],
                [28, 16, 68],
                [79, 18, 123],
                [129, 37, 129],
                [181, 54, 122],
                [229, 80, 100],
                [251, 135, 97],
                [254, 194, 135],
                [252, 253, 191],
            ],
            Colormap::Inferno => &[
                [0, 0, 4],
                [31, 12, 72],
                [85, 15, 109],
                [136, 34, 106],
                [186, 54, 85],
                [227, 89, 51],
                [249, 140, 10],
                [249, 201, 50],
                [252, 255, 164],
            ],
            Colormap::Plasma => &[
                [13, 8, 135],
                [84, 2, 163],
                [139, 10, 165],
                [185, 50, 137],
                [219, 92, 104],
                [244, 136, 73],
                [254, 188, 43],
                [240, 249, 33],
            ],
            Colormap::Viridis => &[
                [68, 1, 84],
                [72, 40, 120],
                [62, 74, 137],
                [49, 104, 142],
                [38, 130, 142],
                [31, 158, 137],
                [53, 183, 121],
                [109, 205, 89],
                [180, 222, 44],
                [253, 231, 37],
            ],
            Colormap::Cividis => &[
                [0, 32, 77],
                [0, 52, 110],
                [57, 70, 108],
                [87, 92, 109],
                [112, 113, 115],
                [138, 136, 120],
                [166, 157, 117],
                [196, 180, 106],
                [227, 205, 86],
                [255, 234, 70],
            ],
            Colormap::Twilight => &[
                [226, 217, 226],
                [155, 173, 202],
                [98, 104, 180],
                [85, 40, 117],
                [47, 20, 48],
                [117, 35, 66],
                [176, 84, 77],
                [208, 153, 134],
                [226, 217, 226],
            ],
            Colormap::TwilightShifted => &[
                [47, 20, 48],
                [117, 35, 66],
                [176, 84, 77],
                [208, 153, 134],
                [226, 217, 226],
                [155, 173, 202],
                [98, 104, 180],
                [85, 40, 117],
                [47, 20, 48],
            ],
            Colormap::Turbo => &[
                [48, 18, 59],
                [70, 107, 227],
                [40, 188, 235],
                [50, 242, 152],
                [164, 252, 60],
                [237, 208, 58],
                [251, 128, 34],
                [208, 47, 5],
                [122, 4, 3],
            ],
            Colormap::DeepGreen => &[
                [0, 0, 0],
                [0, 56, 20],
                [22, 121, 54],
                [97, 186, 89],
                [183, 230, 150],
                [255, 255, 255],
            ],
        }
    }

    /// Builds the 256-entry lookup table for this palette.
    pub fn lut(self) -> Lut {
        let anchors = self.anchors();
        let segments = (anchors.len() - 1) as f32;
        let mut table = [[0u8; 3]; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let position = i as f32 / 255.0 * segments;
            let lower = (position.floor() as usize).min(anchors.len() - 2);
            let t = position - lower as f32;
            let (a, b) = (anchors[lower], anchors[lower + 1]);
            for channel in 0..3 {
                let value = a[channel] as f32 + (b[channel] as f32 - a[channel] as f32) * t;
                entry[channel] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_name_round_trip_for_every_palette() {
        for (i, colormap) in Colormap::ALL.iter().enumerate() {
            assert_eq!(colormap.index(), i as i32);
            assert_eq!(Colormap::from_index(i as i32).unwrap(), *colormap);
            assert_eq!(Colormap::from_name(colormap.name()).unwrap(), *colormap);
        }
    }

    #[test]
    fn names_are_matched_case_insensitively() {
        assert_eq!(Colormap::from_name("twilight_shifted").unwrap(), Colormap::TwilightShifted);
        assert_eq!(Colormap::from_name(" Jet ").unwrap(), Colormap::Jet);
        assert!(Colormap::from_name("SEPIA").is_err());
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        assert!(matches!(Colormap::from_index(-1), Err(Error::InvalidArgument(_))));
        assert!(matches!(Colormap::from_index(22), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn lut_endpoints_match_first_and_last_anchor() {
        let lut = Colormap::Hot.lut();
        assert_eq!(lut[0], [0, 0, 0]);
        assert_eq!(lut[255], [255, 255, 255]);

        let lut = Colormap::Autumn.lut();
        assert_eq!(lut[0], [255, 0, 0]);
        assert_eq!(lut[255], [255, 255, 0]);
        assert_eq!(lut[128][1], 128);
    }
}
