use serde::{Deserialize, Deserializer, Serialize};

/// Response of `GET /devices`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Devices {
    #[serde(default)]
    pub doorbells: Vec<Device>,
    /// Doorbells shared with this account by other owners.
    #[serde(default)]
    pub authorized_doorbells: Vec<Device>,
    #[serde(default)]
    pub stickup_cams: Vec<Device>,
}

impl Devices {
    pub fn all(&self) -> impl Iterator<Item = &Device> {
        self.doorbells
            .iter()
            .chain(self.authorized_doorbells.iter())
            .chain(self.stickup_cams.iter())
    }

    pub fn find(&self, id: u64) -> Option<&Device> {
        self.all().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.doorbells.len() + self.authorized_doorbells.len() + self.stickup_cams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub alerts: Option<Alerts>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub battery_life: Option<f64>,
    /// Second battery on devices that take two packs.
    #[serde(default, deserialize_with = "lenient_number")]
    pub battery_life_2: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub battery_voltage: Option<f64>,
    /// Present on cameras with a controllable light.
    #[serde(default)]
    pub led_status: Option<serde_json::Value>,
}

impl Device {
    pub fn is_online(&self) -> bool {
        self.alerts
            .as_ref()
            .and_then(|a| a.connection.as_deref())
            == Some("online")
    }

    pub fn owner_id(&self) -> Option<u64> {
        self.owner.as_ref().map(|o| o.id)
    }

    pub fn has_light(&self) -> bool {
        self.led_status.as_ref().is_some_and(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alerts {
    #[serde(default)]
    pub connection: Option<String>,
}

/// Response of `GET /user/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
}

/// Ring reports battery values either as numbers or as numeric strings.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
