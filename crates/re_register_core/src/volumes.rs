use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeType {
    FirstSeries,
    SecondSeries,
    Supplements,
    Register,
}

impl VolumeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstSeries => "first_series",
            Self::SecondSeries => "second_series",
            Self::Supplements => "supplements",
            Self::Register => "register",
        }
    }

    fn order(self) -> u8 {
        match self {
            Self::FirstSeries => 1,
            Self::SecondSeries => 2,
            Self::Supplements => 3,
            Self::Register => 4,
        }
    }

    /// Volumes of these types are assembled from out-of-order contributions,
    /// so the updater may create neighbours that are not there yet.
    pub fn allows_neighbour_creation(self) -> bool {
        matches!(self, Self::Supplements | Self::Register)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    name: String,
    year: u16,
}

impl Volume {
    pub fn new(name: impl Into<String>, year: u16) -> Self {
        Self {
            name: name.into(),
            year,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn volume_type(&self) -> VolumeType {
        if self.name == "R" {
            VolumeType::Register
        } else if self.name.starts_with("S ") {
            VolumeType::Supplements
        } else if self.main_issue().ends_with(" A") {
            VolumeType::SecondSeries
        } else {
            VolumeType::FirstSeries
        }
    }

    /// Stem of the JSON file holding this volume's register (`I A,1` -> `I_A_1`).
    pub fn file_name(&self) -> String {
        self.name.replace([',', ' '], "_")
    }

    /// The issue token before the comma (`I` for `I,1`, `I A` for `I A,2`).
    pub fn main_issue(&self) -> &str {
        match self.name.split_once(',') {
            Some((issue, _)) => issue,
            None => &self.name,
        }
    }

    /// Publication-order key: series, roman number, part (`I A,2` -> `2_01_2`).
    pub fn sort_key(&self) -> String {
        let volume_type = self.volume_type();
        let (issue, part) = match self.name.split_once(',') {
            Some((issue, part)) => (issue, part.trim()),
            None => (self.name.as_str(), "0"),
        };
        let roman = match volume_type {
            VolumeType::FirstSeries => issue,
            VolumeType::SecondSeries => issue.trim_end_matches(" A"),
            VolumeType::Supplements => issue.trim_start_matches("S "),
            VolumeType::Register => "",
        };
        format!(
            "{}_{:02}_{}",
            volume_type.order(),
            roman_to_int(roman),
            part
        )
    }
}

fn roman_to_int(roman: &str) -> u32 {
    let mut total = 0u32;
    let mut previous = 0u32;
    for ch in roman.chars().rev() {
        let value = match ch {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            _ => 0,
        };
        if value < previous {
            total = total.saturating_sub(value);
        } else {
            total += value;
            previous = value;
        }
    }
    total
}

const VOLUME_CATALOGUE: &[(&str, u16)] = &[
    ("I,1", 1893),
    ("I,2", 1894),
    ("II,1", 1895),
    ("II,2", 1896),
    ("III,1", 1897),
    ("III,2", 1899),
    ("IV,1", 1900),
    ("IV,2", 1901),
    ("V,1", 1903),
    ("V,2", 1905),
    ("VI,1", 1907),
    ("VI,2", 1909),
    ("VII,1", 1910),
    ("VII,2", 1912),
    ("VIII,1", 1912),
    ("VIII,2", 1913),
    ("IX,1", 1914),
    ("IX,2", 1916),
    ("X,1", 1918),
    ("X,2", 1919),
    ("XI,1", 1921),
    ("XI,2", 1922),
    ("XII,1", 1924),
    ("XII,2", 1925),
    ("XIII,1", 1926),
    ("XIII,2", 1927),
    ("XIV,1", 1928),
    ("XIV,2", 1930),
    ("XV,1", 1931),
    ("XV,2", 1932),
    ("XVI,1", 1933),
    ("XVI,2", 1935),
    ("XVII,1", 1936),
    ("XVII,2", 1937),
    ("XVIII,1", 1939),
    ("XVIII,2", 1942),
    ("XVIII,3", 1949),
    ("XVIII,4", 1949),
    ("XIX,1", 1937),
    ("XIX,2", 1938),
    ("XX,1", 1941),
    ("XX,2", 1950),
    ("XXI,1", 1951),
    ("XXI,2", 1952),
    ("XXII,1", 1953),
    ("XXII,2", 1954),
    ("XXIII,1", 1957),
    ("XXIII,2", 1959),
    ("XXIV", 1963),
    ("I A,1", 1914),
    ("I A,2", 1920),
    ("II A,1", 1921),
    ("II A,2", 1923),
    ("III A,1", 1927),
    ("III A,2", 1929),
    ("IV A,1", 1931),
    ("IV A,2", 1932),
    ("V A,1", 1934),
    ("V A,2", 1934),
    ("VI A,1", 1936),
    ("VI A,2", 1937),
    ("VII A,1", 1939),
    ("VII A,2", 1948),
    ("VIII A,1", 1955),
    ("VIII A,2", 1958),
    ("IX A,1", 1961),
    ("IX A,2", 1967),
    ("X A", 1972),
    ("S I", 1903),
    ("S II", 1913),
    ("S III", 1918),
    ("S IV", 1924),
    ("S V", 1931),
    ("S VI", 1935),
    ("S VII", 1940),
    ("S VIII", 1956),
    ("S IX", 1962),
    ("S X", 1965),
    ("S XI", 1968),
    ("S XII", 1970),
    ("S XIII", 1973),
    ("S XIV", 1974),
    ("S XV", 1978),
    ("R", 1980),
];

/// The printed volumes of the RE in publication order.
#[derive(Debug, Clone)]
pub struct Volumes {
    volumes: Vec<Volume>,
}

impl Default for Volumes {
    fn default() -> Self {
        Self::new()
    }
}

impl Volumes {
    pub fn new() -> Self {
        Self {
            volumes: VOLUME_CATALOGUE
                .iter()
                .map(|(name, year)| Volume::new(*name, *year))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.iter()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|volume| volume.name == name)
    }

    pub fn of_type(&self, volume_type: VolumeType) -> impl Iterator<Item = &Volume> {
        self.volumes
            .iter()
            .filter(move |volume| volume.volume_type() == volume_type)
    }

    /// Names of the volumes printed before and after `name`, if any.
    pub fn neighbours(&self, name: &str) -> (Option<&str>, Option<&str>) {
        let Some(position) = self.volumes.iter().position(|volume| volume.name == name) else {
            return (None, None);
        };
        let previous = position
            .checked_sub(1)
            .and_then(|index| self.volumes.get(index))
            .map(Volume::name);
        let next = self.volumes.get(position + 1).map(Volume::name);
        (previous, next)
    }
}

#[cfg(test)]
mod tests {
    use super::{Volume, VolumeType, Volumes};

    #[test]
    fn volume_types_follow_the_naming_scheme() {
        assert_eq!(Volume::new("I,1", 1893).volume_type(), VolumeType::FirstSeries);
        assert_eq!(Volume::new("XXIV", 1963).volume_type(), VolumeType::FirstSeries);
        assert_eq!(
            Volume::new("I A,1", 1914).volume_type(),
            VolumeType::SecondSeries
        );
        assert_eq!(Volume::new("X A", 1972).volume_type(), VolumeType::SecondSeries);
        assert_eq!(Volume::new("S III", 1918).volume_type(), VolumeType::Supplements);
        assert_eq!(Volume::new("R", 1980).volume_type(), VolumeType::Register);
    }

    #[test]
    fn file_names_and_main_issue() {
        assert_eq!(Volume::new("I,1", 1893).file_name(), "I_1");
        assert_eq!(Volume::new("I A,2", 1920).file_name(), "I_A_2");
        assert_eq!(Volume::new("S I", 1903).file_name(), "S_I");
        assert_eq!(Volume::new("XVIII,3", 1949).main_issue(), "XVIII");
        assert_eq!(Volume::new("I A,2", 1920).main_issue(), "I A");
        assert_eq!(Volume::new("XXIV", 1963).main_issue(), "XXIV");
    }

    #[test]
    fn sort_keys_order_volumes_by_publication_series() {
        assert_eq!(Volume::new("I,1", 1893).sort_key(), "1_01_1");
        assert_eq!(Volume::new("XVIII,3", 1949).sort_key(), "1_18_3");
        assert_eq!(Volume::new("XXIV", 1963).sort_key(), "1_24_0");
        assert_eq!(Volume::new("I A,2", 1920).sort_key(), "2_01_2");
        assert_eq!(Volume::new("S XV", 1978).sort_key(), "3_15_0");
        assert_eq!(Volume::new("R", 1980).sort_key(), "4_00_0");

        let volumes = Volumes::new();
        let keys: Vec<String> = volumes.iter().map(Volume::sort_key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn neighbours_at_the_edges() {
        let volumes = Volumes::new();
        assert_eq!(volumes.neighbours("I,1"), (None, Some("I,2")));
        assert_eq!(volumes.neighbours("I,2"), (Some("I,1"), Some("II,1")));
        assert_eq!(volumes.neighbours("R"), (Some("S XV"), None));
        assert_eq!(volumes.neighbours("nope"), (None, None));
    }

    #[test]
    fn catalogue_filters_by_type() {
        let volumes = Volumes::new();
        assert_eq!(volumes.of_type(VolumeType::Supplements).count(), 15);
        assert_eq!(volumes.of_type(VolumeType::Register).count(), 1);
        assert!(volumes.get("XIX,2").is_some());
    }
}
