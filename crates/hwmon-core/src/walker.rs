//! Hardware tree traversal and per-cycle snapshots

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::registry::SensorRegistry;
use crate::sensor::{HardwareNode, Sensor, SensorId};

/// Render a raw reading as a zero-padded decimal integer of at least three digits.
///
/// The fractional part is truncated and negative readings clamp to zero.
/// Values of 1000 and above keep all their digits.
pub fn render_digits(value: f32) -> String {
    let whole = value.max(0.0).trunc() as u64;
    format!("{:03}", whole)
}

/// One cycle's readings, keyed by sensor identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    values: BTreeMap<SensorId, String>,
}

impl Snapshot {
    pub fn get(&self, id: &SensorId) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &SensorId) -> bool {
        self.values.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SensorId> {
        self.values.keys()
    }
}

impl FromIterator<(SensorId, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (SensorId, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Visit every hardware node in pre-order, including nodes without sensors.
///
/// Uses an explicit stack so arbitrarily deep trees cannot overflow.
pub fn visit_nodes<'a, F>(roots: &'a [HardwareNode], mut visit: F)
where
    F: FnMut(&'a HardwareNode),
{
    let mut stack: Vec<&HardwareNode> = roots.iter().rev().collect();
    while let Some(node) = stack.pop() {
        visit(node);
        stack.extend(node.children.iter().rev());
    }
}

/// Visit every sensor in pre-order (node sensors first, then children in order)
pub fn visit_sensors<'a, F>(roots: &'a [HardwareNode], mut visit: F)
where
    F: FnMut(&'a HardwareNode, &'a Sensor),
{
    visit_nodes(roots, |node| {
        for sensor in &node.sensors {
            visit(node, sensor);
        }
    });
}

/// Collect the wanted sensors into a fresh snapshot.
///
/// Sensors without a usable value are left out. When an identifier occurs
/// more than once the last one visited wins.
pub fn collect(roots: &[HardwareNode], wanted: &BTreeSet<SensorId>) -> Snapshot {
    let mut values = BTreeMap::new();
    visit_sensors(roots, |_, sensor| {
        if !wanted.contains(&sensor.id) {
            return;
        }
        if let Some(value) = sensor.reading() {
            values.insert(sensor.id.clone(), render_digits(value));
        }
    });
    Snapshot { values }
}

/// Diagnostic row describing one sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorListing {
    pub hardware_name: String,
    pub hardware_id: String,
    pub sensor_name: String,
    pub sensor_id: SensorId,
    pub value: Option<f32>,
}

impl SensorListing {
    fn new(node: &HardwareNode, sensor: &Sensor) -> Self {
        Self {
            hardware_name: node.name.clone(),
            hardware_id: node.id.clone(),
            sensor_name: sensor.name.clone(),
            sensor_id: sensor.id.clone(),
            value: sensor.value,
        }
    }
}

/// Every sensor in the tree, in traversal order
pub fn list_all_sensors(roots: &[HardwareNode]) -> Vec<SensorListing> {
    let mut listings = Vec::new();
    visit_sensors(roots, |node, sensor| listings.push(SensorListing::new(node, sensor)));
    listings
}

/// Only the sensors the registry refers to
pub fn list_configured_sensors(roots: &[HardwareNode], registry: &SensorRegistry) -> Vec<SensorListing> {
    let wanted = registry.required_ids();
    let mut listings = Vec::new();
    visit_sensors(roots, |node, sensor| {
        if wanted.contains(&sensor.id) {
            listings.push(SensorListing::new(node, sensor));
        }
    });
    listings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Role;
    use crate::sensor::SensorKind;
    use proptest::prelude::*;

    fn sensor(id: &str, value: f32) -> Sensor {
        Sensor::new(id, id, SensorKind::Load, Some(value))
    }

    fn sample_tree() -> Vec<HardwareNode> {
        let gpu = HardwareNode::new("/gpu/0", "GPU")
            .with_sensor(sensor("/gpu/0/load/0", 88.0))
            .with_child(HardwareNode::new("/gpu/0/mem", "VRAM").with_sensor(sensor("/gpu/0/mem/load/0", 12.0)));
        let cpu = HardwareNode::new("/cpu/0", "CPU")
            .with_sensor(sensor("/cpu/0/load/0", 7.8))
            .with_sensor(sensor("/cpu/0/temperature/0", 45.2));
        vec![cpu, gpu]
    }

    #[test]
    fn test_render_digits() {
        assert_eq!(render_digits(7.8), "007");
        assert_eq!(render_digits(45.2), "045");
        assert_eq!(render_digits(128.9), "128");
        assert_eq!(render_digits(0.0), "000");
        assert_eq!(render_digits(1234.0), "1234");
        assert_eq!(render_digits(-3.0), "000");
    }

    #[test]
    fn test_visit_order_is_preorder() {
        let tree = sample_tree();
        let mut seen = Vec::new();
        visit_sensors(&tree, |_, s| seen.push(s.id.as_str().to_string()));
        assert_eq!(
            seen,
            vec![
                "/cpu/0/load/0",
                "/cpu/0/temperature/0",
                "/gpu/0/load/0",
                "/gpu/0/mem/load/0"
            ]
        );
    }

    #[test]
    fn test_visit_nodes_includes_empty_nodes() {
        let tree = vec![
            HardwareNode::new("/board", "Board").with_child(HardwareNode::new("/board/fan", "Fan Controller")),
            HardwareNode::new("/ram", "Memory"),
        ];
        let mut ids = Vec::new();
        visit_nodes(&tree, |node| ids.push(node.id.as_str()));
        assert_eq!(ids, ["/board", "/board/fan", "/ram"]);
    }

    #[test]
    fn test_collect_only_wanted() {
        let tree = sample_tree();
        let wanted: BTreeSet<SensorId> = ["/cpu/0/load/0", "/gpu/0/mem/load/0", "/missing"]
            .into_iter()
            .map(SensorId::from)
            .collect();

        let snapshot = collect(&tree, &wanted);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&SensorId::from("/cpu/0/load/0")), Some("007"));
        assert_eq!(snapshot.get(&SensorId::from("/gpu/0/mem/load/0")), Some("012"));
        assert!(!snapshot.contains(&SensorId::from("/missing")));
    }

    #[test]
    fn test_collect_last_write_wins() {
        let tree = vec![
            HardwareNode::new("/a", "A").with_sensor(sensor("/dup", 1.0)),
            HardwareNode::new("/b", "B").with_sensor(sensor("/dup", 2.0)),
        ];
        let wanted = BTreeSet::from([SensorId::from("/dup")]);
        assert_eq!(collect(&tree, &wanted).get(&SensorId::from("/dup")), Some("002"));
    }

    #[test]
    fn test_collect_skips_unavailable_values() {
        let tree = vec![HardwareNode::new("/a", "A")
            .with_sensor(Sensor::new("/nan", "nan", SensorKind::Temperature, Some(f32::NAN)))
            .with_sensor(Sensor::new("/none", "none", SensorKind::Temperature, None))];
        let wanted = BTreeSet::from([SensorId::from("/nan"), SensorId::from("/none")]);
        assert!(collect(&tree, &wanted).is_empty());
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let mut node = HardwareNode::new("/leaf", "leaf").with_sensor(sensor("/deep", 5.0));
        for i in 0..100_000 {
            node = HardwareNode::new(format!("/n{}", i), "n").with_child(node);
        }
        let wanted = BTreeSet::from([SensorId::from("/deep")]);
        let roots = vec![node];
        assert_eq!(collect(&roots, &wanted).get(&SensorId::from("/deep")), Some("005"));
        // Dropping a 100k-deep tree recursively would overflow; unwind it iteratively.
        let mut stack = roots;
        while let Some(mut n) = stack.pop() {
            stack.append(&mut n.children);
        }
    }

    #[test]
    fn test_listings() {
        let tree = sample_tree();
        let all = list_all_sensors(&tree);
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].hardware_name, "CPU");
        assert_eq!(all[3].hardware_id, "/gpu/0/mem");

        let registry = SensorRegistry::new()
            .with_sensor(Role::CpuTemp, "/cpu/0/temperature/0")
            .with_sensor(Role::Gpu1Load, "/gpu/0/load/0");
        let configured = list_configured_sensors(&tree, &registry);
        assert_eq!(configured.len(), 2);
        assert_eq!(configured[0].sensor_id.as_str(), "/cpu/0/temperature/0");
        assert_eq!(configured[0].value, Some(45.2));
    }

    fn arb_tree() -> impl Strategy<Value = Vec<HardwareNode>> {
        // Flat list of up to 50 nodes, each nested under a random earlier node
        prop::collection::vec(
            (
                any::<prop::sample::Index>(),
                prop::collection::vec((0u8..40, 0.0f32..2000.0), 0..20),
            ),
            0..50,
        )
        .prop_map(|specs| {
            let mut nodes: Vec<(Option<usize>, HardwareNode)> = Vec::new();
            for (i, (parent, sensors)) in specs.into_iter().enumerate() {
                let mut node = HardwareNode::new(format!("/hw/{}", i), format!("hw{}", i));
                for (id, value) in sensors {
                    node = node.with_sensor(sensor(&format!("/s/{}", id), value));
                }
                let parent = if i == 0 { None } else { Some(parent.index(i)) };
                nodes.push((parent, node));
            }
            // Attach children to parents, last first, so indices stay valid
            let mut roots = Vec::new();
            while let Some((parent, node)) = nodes.pop() {
                match parent {
                    Some(p) if p < nodes.len() => nodes[p].1.children.push(node),
                    _ => roots.push(node),
                }
            }
            roots
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_render_digits_three_wide(v in 0.0f32..1000.0) {
            let rendered = render_digits(v);
            prop_assert_eq!(rendered.len(), 3);
            prop_assert_eq!(rendered.parse::<u32>().unwrap(), v.trunc() as u32);
        }

        #[test]
        fn prop_collect_bounded_by_wanted(
            tree in arb_tree(),
            wanted in prop::collection::btree_set(0u8..60, 0..10)
        ) {
            let wanted: BTreeSet<SensorId> =
                wanted.into_iter().map(|id| SensorId(format!("/s/{}", id))).collect();
            let snapshot = collect(&tree, &wanted);
            prop_assert!(snapshot.len() <= wanted.len());
            for id in snapshot.ids() {
                prop_assert!(wanted.contains(id));
            }
        }
    }
}
