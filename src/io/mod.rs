pub mod output_dot;
pub mod output_json;
