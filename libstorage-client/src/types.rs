//! Response shapes returned by the libStorage service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Names of the root resources, in server order.
pub type RootResponse = Vec<String>;

/// Volumes grouped by the name of the service that owns them.
pub type ServiceVolumeMap = BTreeMap<String, Vec<Volume>>;

/// A storage volume.
///
/// Every field defaults when the server omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub volume_type: String,
    /// Size in GiB.
    pub size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub iops: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub availability_zone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<VolumeAttachment>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

/// An attachment of a volume to an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeAttachment {
    #[serde(rename = "instanceID", skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(rename = "volumeID")]
    pub volume_id: String,
}

/// Identifies an instance within a storage driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceId {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub driver: String,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_map_from_server_json() {
        let json = r#"{
            "ebs": [{
                "id": "vol-123",
                "name": "data",
                "type": "gp2",
                "size": 16,
                "availabilityZone": "us-east-1a",
                "attachments": [{
                    "instanceID": {"id": "i-abc", "driver": "ebs"},
                    "deviceName": "/dev/xvdf",
                    "status": "attached",
                    "volumeID": "vol-123"
                }],
                "fields": {"encrypted": "true"}
            }],
            "vfs": []
        }"#;

        let map: ServiceVolumeMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map["vfs"].is_empty());

        let vol = &map["ebs"][0];
        assert_eq!(vol.id, "vol-123");
        assert_eq!(vol.volume_type, "gp2");
        assert_eq!(vol.size, 16);
        assert_eq!(vol.availability_zone, "us-east-1a");
        assert_eq!(vol.attachments[0].device_name, "/dev/xvdf");
        assert_eq!(
            vol.attachments[0].instance_id.as_ref().map(|i| i.id.as_str()),
            Some("i-abc")
        );
        assert_eq!(vol.fields.get("encrypted").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_sparse_volume_defaults() {
        let vol: Volume = serde_json::from_str(r#"{"id":"v","unknown":1}"#).unwrap();
        assert_eq!(vol.id, "v");
        assert!(vol.name.is_empty());
        assert!(vol.attachments.is_empty());
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let vol = Volume {
            id: "v".into(),
            name: "n".into(),
            size: 1,
            ..Volume::default()
        };
        assert_eq!(
            serde_json::to_string(&vol).unwrap(),
            r#"{"id":"v","name":"n","size":1}"#
        );
    }
}
