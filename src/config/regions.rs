//! AWS region codes accepted in the signing scope.
//!
//! MinIO and most S3-compatible servers accept any region string; these are the
//! ones AWS itself serves.

pub const US_EAST_1: &str = "us-east-1";
pub const US_EAST_2: &str = "us-east-2";
pub const US_WEST_1: &str = "us-west-1";
pub const US_WEST_2: &str = "us-west-2";
pub const AF_SOUTH_1: &str = "af-south-1";
pub const AP_EAST_1: &str = "ap-east-1";
pub const AP_SOUTH_1: &str = "ap-south-1";
pub const AP_NORTHEAST_1: &str = "ap-northeast-1";
pub const AP_NORTHEAST_2: &str = "ap-northeast-2";
pub const AP_NORTHEAST_3: &str = "ap-northeast-3";
pub const AP_SOUTHEAST_1: &str = "ap-southeast-1";
pub const AP_SOUTHEAST_2: &str = "ap-southeast-2";
pub const CA_CENTRAL_1: &str = "ca-central-1";
pub const EU_CENTRAL_1: &str = "eu-central-1";
pub const EU_WEST_1: &str = "eu-west-1";
pub const EU_WEST_2: &str = "eu-west-2";
pub const EU_WEST_3: &str = "eu-west-3";
pub const EU_SOUTH_1: &str = "eu-south-1";
pub const EU_NORTH_1: &str = "eu-north-1";
pub const SA_EAST_1: &str = "sa-east-1";
pub const ME_SOUTH_1: &str = "me-south-1";
pub const CN_NORTH_1: &str = "cn-north-1";
pub const CN_NORTHWEST_1: &str = "cn-northwest-1";
pub const US_GOV_EAST_1: &str = "us-gov-east-1";
pub const US_GOV_WEST_1: &str = "us-gov-west-1";

/// Every region above, for validation and CLI help.
pub const ALL: &[&str] = &[
    US_EAST_1,
    US_EAST_2,
    US_WEST_1,
    US_WEST_2,
    AF_SOUTH_1,
    AP_EAST_1,
    AP_SOUTH_1,
    AP_NORTHEAST_1,
    AP_NORTHEAST_2,
    AP_NORTHEAST_3,
    AP_SOUTHEAST_1,
    AP_SOUTHEAST_2,
    CA_CENTRAL_1,
    EU_CENTRAL_1,
    EU_WEST_1,
    EU_WEST_2,
    EU_WEST_3,
    EU_SOUTH_1,
    EU_NORTH_1,
    SA_EAST_1,
    ME_SOUTH_1,
    CN_NORTH_1,
    CN_NORTHWEST_1,
    US_GOV_EAST_1,
    US_GOV_WEST_1,
];

/// Whether `region` is one AWS serves. Custom regions stay valid for other backends.
pub fn is_aws_region(region: &str) -> bool {
    ALL.contains(&region)
}
