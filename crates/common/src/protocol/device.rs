use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommDeviceType {
    Radio,
    Megaphone,
    Phone,
    PhoneSpeaker,
    Intercom,
    PhoneHistorical,
}

impl CommDeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Radio => "RADIO",
            Self::Megaphone => "MEGAPHONE",
            Self::Phone => "PHONE",
            Self::PhoneSpeaker => "PHONE_SPEAKER",
            Self::Intercom => "INTERCOM",
            Self::PhoneHistorical => "PHONE_HISTORICAL",
        }
    }

    pub fn is_phone(&self) -> bool {
        matches!(
            self,
            Self::Phone | Self::PhoneSpeaker | Self::PhoneHistorical
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommDeviceMode {
    Sender,
    Receiver,
    Transceiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StereoMode {
    #[default]
    Stereo,
    MonoLeft,
    MonoRight,
}

impl StereoMode {
    pub fn next(self) -> Self {
        match self {
            Self::Stereo => Self::MonoLeft,
            Self::MonoLeft => Self::MonoRight,
            Self::MonoRight => Self::Stereo,
        }
    }
}
