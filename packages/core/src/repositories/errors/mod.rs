pub mod upstream_errors;
