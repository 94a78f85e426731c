// Domain layer: intake data model, the derived status rule and the ports to external collaborators.

pub mod model;
pub mod ports;
pub mod status;
pub mod work_order;
