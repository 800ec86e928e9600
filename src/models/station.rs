use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use crate::geometry::{cross_product_2d, GeoPoint};

/// Lateral position of a platform relative to the station track axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformSide {
    Left,
    Right,
}

impl PlatformSide {
    /// Classify a point (local metres around the station origin) against the axis
    #[must_use]
    pub fn classify(axis: (f64, f64), point: (f64, f64)) -> Option<Self> {
        let cross = cross_product_2d((0.0, 0.0), axis, point);
        if cross.abs() < 1e-6 {
            None
        } else if cross > 0.0 {
            Some(PlatformSide::Left)
        } else {
            Some(PlatformSide::Right)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopCandidate {
    #[serde(with = "node_index_serde")]
    pub node: NodeIndex,
    pub node_id: String,
    pub platform_ref: Option<String>,
    pub side: Option<PlatformSide>,
}

impl StopCandidate {
    /// Whether this candidate serves the platform named by `hint`
    #[must_use]
    pub fn matches_platform(&self, hint: &str) -> bool {
        let wanted = normalize_platform_ref(hint);
        !wanted.is_empty()
            && self
                .platform_ref
                .as_deref()
                .is_some_and(|r| normalize_platform_ref(r) == wanted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub position: GeoPoint,
    /// Mean position of the usable stop nodes, the station position when
    /// there are none
    pub centroid: GeoPoint,
    pub candidates: Vec<StopCandidate>,
    /// First usable candidate (present in the graph with at least one track)
    #[serde(with = "option_node_index_serde")]
    pub primary_stop: Option<NodeIndex>,
    /// Unit vector (local east/north) along the station tracks
    pub axis: Option<(f64, f64)>,
}

impl Station {
    /// Side of the station a point lies on, using the platform axis through
    /// the stop centroid. `None` without an axis or for points on it.
    #[must_use]
    pub fn side_of(&self, point: &GeoPoint) -> Option<PlatformSide> {
        let axis = self.axis?;
        PlatformSide::classify(axis, point.to_local(&self.centroid))
    }

    #[must_use]
    pub fn candidate_for_node(&self, node: NodeIndex) -> Option<&StopCandidate> {
        self.candidates.iter().find(|c| c.node == node)
    }
}

/// Normalise a platform reference for comparison: case-insensitive, reduced
/// to the trailing number plus letter suffix when one exists
/// (`"Gleis 12b"` → `"12b"`, `"Platform 3"` → `"3"`).
#[must_use]
pub fn normalize_platform_ref(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let chars: Vec<char> = lower.chars().collect();

    let Some(last_digit) = chars.iter().rposition(char::is_ascii_digit) else {
        return lower;
    };
    let mut start = last_digit;
    while start > 0 && chars[start - 1].is_ascii_digit() {
        start -= 1;
    }
    let mut end = last_digit + 1;
    while end < chars.len() && chars[end].is_alphabetic() {
        end += 1;
    }
    let number: String = chars[start..=last_digit].iter().collect();
    let suffix: String = chars[last_digit + 1..end].iter().collect();
    // Leading zeros are noise ("03" == "3")
    let trimmed = number.trim_start_matches('0');
    let number = if trimmed.is_empty() { "0" } else { trimmed };
    format!("{number}{suffix}")
}

mod node_index_serde {
    use petgraph::graph::NodeIndex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(index: &NodeIndex, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(index.index() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NodeIndex, D::Error>
    where
        D: Deserializer<'de>,
    {
        let index = usize::deserialize(deserializer)?;
        Ok(NodeIndex::new(index))
    }
}

mod option_node_index_serde {
    use petgraph::graph::NodeIndex;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(index: &Option<NodeIndex>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match index {
            Some(i) => serializer.serialize_some(&(i.index() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NodeIndex>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let index = Option::<usize>::deserialize(deserializer)?;
        Ok(index.map(NodeIndex::new))
    }
}
