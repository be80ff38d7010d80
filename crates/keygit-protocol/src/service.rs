use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// The two smart-HTTP services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Service {
    /// Fetch and clone.
    UploadPack,
    /// Push.
    ReceivePack,
}

impl Service {
    /// Wire name, e.g. `git-upload-pack`.
    pub fn name(&self) -> &'static str {
        match self {
            Service::UploadPack => "git-upload-pack",
            Service::ReceivePack => "git-receive-pack",
        }
    }

    pub fn advertisement_content_type(&self) -> &'static str {
        match self {
            Service::UploadPack => "application/x-git-upload-pack-advertisement",
            Service::ReceivePack => "application/x-git-receive-pack-advertisement",
        }
    }

    pub fn request_content_type(&self) -> &'static str {
        match self {
            Service::UploadPack => "application/x-git-upload-pack-request",
            Service::ReceivePack => "application/x-git-receive-pack-request",
        }
    }

    pub fn result_content_type(&self) -> &'static str {
        match self {
            Service::UploadPack => "application/x-git-upload-pack-result",
            Service::ReceivePack => "application/x-git-receive-pack-result",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Service {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git-upload-pack" => Ok(Service::UploadPack),
            "git-receive-pack" => Ok(Service::ReceivePack),
            other => Err(ProtocolError::UnknownService(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for service in [Service::UploadPack, Service::ReceivePack] {
            assert_eq!(service.name().parse::<Service>().unwrap(), service);
        }
    }

    #[test]
    fn unknown_service_rejected() {
        let err = "git-bogus-pack".parse::<Service>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownService(ref s) if s == "git-bogus-pack"));
        assert!("upload-pack".parse::<Service>().is_err());
    }

    #[test]
    fn content_types() {
        assert_eq!(
            Service::ReceivePack.request_content_type(),
            "application/x-git-receive-pack-request"
        );
        assert_eq!(
            Service::UploadPack.result_content_type(),
            "application/x-git-upload-pack-result"
        );
        assert_eq!(
            Service::UploadPack.advertisement_content_type(),
            "application/x-git-upload-pack-advertisement"
        );
    }
}
