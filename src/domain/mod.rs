// Domain layer: listing models and ports (storage, workbook, completion client, pipeline).

pub mod model;
pub mod ports;
