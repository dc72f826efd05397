//! Channel manifest
//!
//! Built once from the registry: how many tracker, analog and button channels
//! exist and which semantic path each index stands for. Indices within a kind
//! are assigned in registration order, then schema field order.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::registry::PeripheralSpec;
use crate::schema::{schema_for, TRACKER_SUFFIX};

/// Vendor reported in the manifest descriptor
pub const DEVICE_VENDOR: &str = "Sony";

/// Author reported in the manifest descriptor
pub const DEVICE_AUTHOR: &str = "InfiniteLlamas";

/// Highest value an analog channel carries
pub const ANALOG_MAX: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Tracker,
    Analog,
    Button,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracker => "tracker",
            Self::Analog => "analog",
            Self::Button => "button",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One channel slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    pub kind: ChannelKind,
    pub index: usize,
}

impl ChannelRef {
    pub fn new(kind: ChannelKind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.index)
    }
}

/// Running next-free index per channel kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursors {
    pub tracker: usize,
    pub analog: usize,
    pub button: usize,
}

impl Cursors {
    /// Take the next index of `kind`
    pub fn claim(&mut self, kind: ChannelKind) -> usize {
        let slot = match kind {
            ChannelKind::Tracker => &mut self.tracker,
            ChannelKind::Analog => &mut self.analog,
            ChannelKind::Button => &mut self.button,
        };
        let index = *slot;
        *slot += 1;
        index
    }

    pub fn get(&self, kind: ChannelKind) -> usize {
        match kind {
            ChannelKind::Tracker => self.tracker,
            ChannelKind::Analog => self.analog,
            ChannelKind::Button => self.button,
        }
    }
}

/// Channel counts and the semantic path of every index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelManifest {
    pub tracker_count: usize,
    pub analog_count: usize,
    pub button_count: usize,
    /// `<peripheral>/<suffix>` to channel
    pub semantic: BTreeMap<String, ChannelRef>,
}

impl ChannelManifest {
    /// Assign channels to every peripheral, in the order given
    pub fn build<'a>(specs: impl IntoIterator<Item = &'a PeripheralSpec>) -> Self {
        let mut cursors = Cursors::default();
        let mut semantic = BTreeMap::new();
        let mut record = |name: &str, suffix: &str, kind: ChannelKind, cursors: &mut Cursors| {
            let channel = ChannelRef::new(kind, cursors.claim(kind));
            semantic.insert(format!("{}/{}", name, suffix), channel);
        };

        for spec in specs {
            let schema = schema_for(spec.kind);
            if schema.trackable {
                record(&spec.name, TRACKER_SUFFIX, ChannelKind::Tracker, &mut cursors);
            }
            for field in schema.analogs {
                record(&spec.name, field.suffix(), ChannelKind::Analog, &mut cursors);
            }
            for field in schema.buttons {
                record(&spec.name, field.suffix(), ChannelKind::Button, &mut cursors);
            }
        }

        Self {
            tracker_count: cursors.tracker,
            analog_count: cursors.analog,
            button_count: cursors.button,
            semantic,
        }
    }

    pub fn count(&self, kind: ChannelKind) -> usize {
        match kind {
            ChannelKind::Tracker => self.tracker_count,
            ChannelKind::Analog => self.analog_count,
            ChannelKind::Button => self.button_count,
        }
    }

    /// Channel behind a semantic path
    pub fn lookup(&self, path: &str) -> Option<ChannelRef> {
        self.semantic.get(path).copied()
    }

    /// Semantic paths of one kind, ordered by index
    pub fn paths_of(&self, kind: ChannelKind) -> Vec<(usize, &str)> {
        let mut paths: Vec<(usize, &str)> = self
            .semantic
            .iter()
            .filter(|(_, channel)| channel.kind == kind)
            .map(|(path, channel)| (channel.index, path.as_str()))
            .collect();
        paths.sort_unstable();
        paths
    }

    pub fn is_empty(&self) -> bool {
        self.tracker_count == 0 && self.analog_count == 0 && self.button_count == 0
    }

    /// Self-describing device descriptor handed to the consuming runtime
    pub fn descriptor(&self, device_name: &str) -> Value {
        let semantic: serde_json::Map<String, Value> = self
            .semantic
            .iter()
            .map(|(path, channel)| (path.clone(), Value::String(channel.to_string())))
            .collect();

        json!({
            "deviceVendor": DEVICE_VENDOR,
            "deviceName": device_name,
            "author": DEVICE_AUTHOR,
            "version": env!("CARGO_PKG_VERSION"),
            "interfaces": {
                "tracker": {
                    "position": true,
                    "orientation": true,
                    "count": self.tracker_count,
                },
                "analog": {
                    "count": self.analog_count,
                    "traits": [{ "min": 0, "max": ANALOG_MAX }],
                },
                "button": {
                    "count": self.button_count,
                },
            },
            "semantic": semantic,
        })
    }

    /// Pretty-printed [`ChannelManifest::descriptor`]
    pub fn descriptor_json(&self, device_name: &str) -> String {
        format!("{:#}", self.descriptor(device_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PeripheralType;

    fn spec(name: &str, kind: PeripheralType) -> PeripheralSpec {
        PeripheralSpec {
            name: name.to_string(),
            service_id: 0,
            kind,
        }
    }

    #[test]
    fn test_single_wand() {
        let specs = [spec("left", PeripheralType::WandController)];
        let manifest = ChannelManifest::build(&specs);

        assert_eq!(manifest.tracker_count, 1);
        assert_eq!(manifest.analog_count, 1);
        assert_eq!(manifest.button_count, 9);
        assert_eq!(manifest.lookup("left/tracker"), Some(ChannelRef::new(ChannelKind::Tracker, 0)));
        assert_eq!(manifest.lookup("left/trigger"), Some(ChannelRef::new(ChannelKind::Analog, 0)));

        let buttons = manifest.paths_of(ChannelKind::Button);
        let indices: Vec<usize> = buttons.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, (0..9).collect::<Vec<_>>());
        assert_eq!(buttons[0].1, "left/triangle");
        assert_eq!(buttons[8].1, "left/triggerbtn");
    }

    #[test]
    fn test_nav_then_wand_preserves_order() {
        let specs = [
            spec("nav", PeripheralType::NavController),
            spec("wand", PeripheralType::WandController),
        ];
        let manifest = ChannelManifest::build(&specs);

        assert_eq!(manifest.analog_count, 4);
        assert_eq!(manifest.lookup("nav/trigger").map(|c| c.index), Some(0));
        assert_eq!(manifest.lookup("nav/stickx").map(|c| c.index), Some(1));
        assert_eq!(manifest.lookup("nav/sticky").map(|c| c.index), Some(2));
        assert_eq!(manifest.lookup("wand/trigger").map(|c| c.index), Some(3));
        // The nav is untracked, so the wand owns tracker 0
        assert_eq!(manifest.lookup("wand/tracker").map(|c| c.index), Some(0));
        assert_eq!(manifest.button_count, 11 + 9);
        assert_eq!(manifest.lookup("wand/triangle").map(|c| c.index), Some(11));
    }

    #[test]
    fn test_empty_registry() {
        let specs: [PeripheralSpec; 0] = [];
        let manifest = ChannelManifest::build(&specs);
        assert!(manifest.is_empty());
        assert!(manifest.semantic.is_empty());
    }

    #[test]
    fn test_counts_are_sums_of_schemas() {
        let specs: Vec<PeripheralSpec> = PeripheralType::ALL
            .iter()
            .chain(PeripheralType::ALL.iter())
            .enumerate()
            .map(|(i, kind)| spec(&format!("p{i}"), *kind))
            .collect();
        let manifest = ChannelManifest::build(&specs);

        let mut expected = Cursors::default();
        for s in &specs {
            let schema = schema_for(s.kind);
            expected.tracker += schema.tracker_count();
            expected.analog += schema.analogs.len();
            expected.button += schema.buttons.len();
        }
        for kind in [ChannelKind::Tracker, ChannelKind::Analog, ChannelKind::Button] {
            assert_eq!(manifest.count(kind), expected.get(kind));
            // Contiguous, no gaps or duplicates
            let indices: Vec<usize> = manifest.paths_of(kind).iter().map(|(i, _)| *i).collect();
            assert_eq!(indices, (0..expected.get(kind)).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let specs = [
            spec("pad", PeripheralType::Gamepad4Axis),
            spec("nav", PeripheralType::NavController),
            spec("head", PeripheralType::PhysicalHMD),
        ];
        let a = ChannelManifest::build(&specs);
        let b = ChannelManifest::build(&specs);
        assert_eq!(a, b);
        assert_eq!(a.descriptor_json("MoveDevice"), b.descriptor_json("MoveDevice"));
    }

    #[test]
    fn test_descriptor_shape() {
        let specs = [spec("pad", PeripheralType::Gamepad4Axis)];
        let descriptor = ChannelManifest::build(&specs).descriptor("MoveDevice");

        assert_eq!(descriptor["deviceName"], "MoveDevice");
        assert_eq!(descriptor["interfaces"]["analog"]["count"], 6);
        assert_eq!(descriptor["interfaces"]["analog"]["traits"][0]["max"], 255);
        assert_eq!(descriptor["interfaces"]["button"]["count"], 18);
        assert_eq!(descriptor["semantic"]["pad/tracker"], "tracker/0");
        assert_eq!(descriptor["semantic"]["pad/rstickx"], "analog/2");
        assert_eq!(descriptor["semantic"]["pad/rsticky"], "analog/3");
        assert!(descriptor["semantic"].get("padrstickx").is_none());
    }

    #[test]
    fn test_descriptor_json_is_complete() {
        let specs = [spec("left", PeripheralType::WandController)];
        let manifest = ChannelManifest::build(&specs);
        let text = manifest.descriptor_json("MoveDevice");
        assert!(!text.is_empty());
        assert!(text.contains('\n'));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, manifest.descriptor("MoveDevice"));
    }
}
