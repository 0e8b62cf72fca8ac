pub mod aggregation_use_case;
pub mod ports;
pub mod transform_use_case;
