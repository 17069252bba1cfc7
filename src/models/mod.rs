pub mod goodwe_gateway;
pub mod sems_portal;
pub mod solcast_forecast;
pub mod tibber_price;
