use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Key holding the array of top-level disks in `diskutil list -plist` output
pub const ALL_DISKS_KEY: &str = "AllDisksAndPartitions";

/// A disk, partition or APFS volume
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiskNode {
    /// Short device name, eg `disk2s1`
    #[serde(rename = "DeviceIdentifier", deserialize_with = "lenient_string")]
    pub device_identifier: String,
    /// Partition or content type such as `EFI`; empty when unknown
    #[serde(rename = "Content", deserialize_with = "lenient_string")]
    pub content: String,
    /// Volume label; empty when unnamed
    #[serde(rename = "VolumeName", deserialize_with = "lenient_string")]
    pub volume_name: String,
    /// Size in bytes, 0 when unknown
    #[serde(rename = "Size", deserialize_with = "lenient_size")]
    pub size: u64,
    /// Entries of the partition table, in listing order
    #[serde(rename = "Partitions", deserialize_with = "lenient_children")]
    pub partitions: Vec<DiskNode>,
    /// Volumes inside an APFS container, in listing order
    #[serde(rename = "APFSVolumes", deserialize_with = "lenient_children")]
    pub apfs_volumes: Vec<DiskNode>,
}

impl DiskNode {
    /// Build a node from a decoded record.
    ///
    /// Anything that is not an object becomes an empty node instead of an error.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        from_record(value)
    }

    /// Children in display order: partitions first, then APFS volumes
    pub fn children(&self) -> impl Iterator<Item = &DiskNode> {
        self.partitions.iter().chain(&self.apfs_volumes)
    }

    /// The `/dev/...` path for this node
    #[must_use]
    pub fn device_path(&self) -> String {
        format!("/dev/{}", self.device_identifier)
    }

    /// Content type, treating an unlabeled node with APFS volumes as an APFS container
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        if !self.content.is_empty() {
            Some(&self.content)
        } else if !self.apfs_volumes.is_empty() {
            Some("APFS")
        } else {
            None
        }
    }
}

/// Facts about a single device from `diskutil info -plist`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    /// Device size in bytes, if reported as a number
    #[serde(rename = "TotalSize", deserialize_with = "lenient_optional_size")]
    pub total_size: Option<u64>,
    /// Whether the device is built into the machine
    #[serde(rename = "Internal", deserialize_with = "lenient_bool")]
    pub internal: bool,
}

impl DeviceInfo {
    /// Build the info from a decoded record; anything that is not an object yields the defaults.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        from_record(value)
    }
}

/// Decode a keyed record. Serde would also fill a struct from an array by position, so only
/// objects are decoded.
fn from_record<T: Default + DeserializeOwned>(value: Value) -> T {
    match value {
        Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => T::default(),
    }
}

/// Extract the top-level disks from a decoded `diskutil list` document.
///
/// Returns `None` when the document has no array under [`ALL_DISKS_KEY`].
#[must_use]
pub fn parse_disk_list(mut root: Value) -> Option<Vec<DiskNode>> {
    match root.get_mut(ALL_DISKS_KEY).map(Value::take) {
        Some(Value::Array(items)) => Some(items.into_iter().map(DiskNode::from_value).collect()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn size_from_value(value: &Value) -> Option<u64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_u64()
        .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

fn lenient_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(size_from_value(&Value::deserialize(deserializer)?).unwrap_or(0))
}

fn lenient_optional_size<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    Ok(size_from_value(&Value::deserialize(deserializer)?))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

fn lenient_children<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<DiskNode>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(DiskNode::from_value).collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_record() {
        let node = DiskNode::from_value(json!({
            "DeviceIdentifier": "disk3",
            "Content": "Apple_APFS_Container",
            "VolumeName": "",
            "Size": 994_662_584_320_u64,
            "Partitions": [],
            "APFSVolumes": [
                {"DeviceIdentifier": "disk3s1", "VolumeName": "Macintosh HD", "Size": 11_200_000_000_u64},
                {"DeviceIdentifier": "disk3s5", "VolumeName": "Data", "Size": 500_000_000_000_u64}
            ]
        }));
        assert_eq!(node.device_identifier, "disk3");
        assert_eq!(node.content, "Apple_APFS_Container");
        assert_eq!(node.size, 994_662_584_320);
        assert_eq!(node.apfs_volumes.len(), 2);
        assert_eq!(node.apfs_volumes[1].volume_name, "Data");
    }

    #[test]
    fn test_missing_fields_default() {
        let node = DiskNode::from_value(json!({"DeviceIdentifier": "disk9"}));
        assert_eq!(
            node,
            DiskNode {
                device_identifier: "disk9".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_mistyped_fields_default() {
        let node = DiskNode::from_value(json!({
            "DeviceIdentifier": 12,
            "Content": ["EFI"],
            "VolumeName": null,
            "Size": "big",
            "Partitions": {"not": "an array"},
            "APFSVolumes": "nope"
        }));
        assert_eq!(node, DiskNode::default());
    }

    #[test]
    fn test_float_and_negative_sizes() {
        assert_eq!(DiskNode::from_value(json!({"Size": 2048.0})).size, 2048);
        assert_eq!(DiskNode::from_value(json!({"Size": -5})).size, 0);
    }

    #[test]
    fn test_malformed_child_degrades_to_empty_node() {
        let node = DiskNode::from_value(json!({
            "DeviceIdentifier": "disk4",
            "Partitions": [42, ["disk4s1", "Apple_HFS", "Boot", 4096], {"DeviceIdentifier": "disk4s2"}]
        }));
        assert_eq!(node.partitions.len(), 3);
        assert_eq!(node.partitions[0], DiskNode::default());
        assert_eq!(node.partitions[1], DiskNode::default());
        assert_eq!(node.partitions[2].device_identifier, "disk4s2");
    }

    #[test]
    fn test_array_shaped_records_are_not_decoded_by_position() {
        let disks = parse_disk_list(json!({
            "AllDisksAndPartitions": [["disk0", "EFI", "Boot", 4096]]
        }))
        .unwrap();
        assert_eq!(disks, [DiskNode::default()]);

        assert_eq!(DeviceInfo::from_value(json!([123, true])), DeviceInfo::default());
    }

    #[test]
    fn test_children_order() {
        let node = DiskNode::from_value(json!({
            "APFSVolumes": [{"DeviceIdentifier": "v1"}, {"DeviceIdentifier": "v2"}],
            "Partitions": [{"DeviceIdentifier": "p1"}, {"DeviceIdentifier": "p2"}]
        }));
        let ids: Vec<&str> = node
            .children()
            .map(|c| c.device_identifier.as_str())
            .collect();
        assert_eq!(ids, ["p1", "p2", "v1", "v2"]);
    }

    #[test]
    fn test_content_type() {
        let mut node = DiskNode::default();
        assert_eq!(node.content_type(), None);
        node.apfs_volumes.push(DiskNode::default());
        assert_eq!(node.content_type(), Some("APFS"));
        node.content = "Apple_APFS_Container".to_string();
        assert_eq!(node.content_type(), Some("Apple_APFS_Container"));
    }

    #[test]
    fn test_parse_disk_list() {
        let disks = parse_disk_list(json!({
            "AllDisks": ["disk0"],
            "AllDisksAndPartitions": [{"DeviceIdentifier": "disk0"}, {"DeviceIdentifier": "disk1"}]
        }))
        .unwrap();
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[1].device_identifier, "disk1");
    }

    #[test]
    fn test_parse_disk_list_unexpected_structure() {
        assert!(parse_disk_list(json!({"AllDisks": []})).is_none());
        assert!(parse_disk_list(json!({"AllDisksAndPartitions": "disk0"})).is_none());
        assert!(parse_disk_list(json!([1, 2])).is_none());
    }

    #[test]
    fn test_device_info() {
        let info = DeviceInfo::from_value(json!({"TotalSize": 500_107_862_016_u64, "Internal": true}));
        assert_eq!(info.total_size, Some(500_107_862_016));
        assert!(info.internal);

        let info = DeviceInfo::from_value(json!({"Internal": "yes"}));
        assert_eq!(info, DeviceInfo::default());
    }
}
