//! Warehouse selection for shipment origins.
//!
//! Rate lookups that opt in to warehouse dispatch rewrite the shipment
//! origin to the warehouse nearest the destination, measured as great-circle
//! distance. Selection is a pure computation over the catalog; destinations
//! without coordinates fall back to the first (primary) warehouse.

use crate::{Address, ValidationError, Warehouse};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinate pairs, in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Nearest-warehouse selector over a fixed catalog.
#[derive(Debug, Clone)]
pub struct WarehouseSelector {
    warehouses: Vec<Warehouse>,
}

impl WarehouseSelector {
    pub fn new(warehouses: Vec<Warehouse>) -> Result<Self, ValidationError> {
        if warehouses.is_empty() {
            return Err(ValidationError::EmptyWarehouseCatalog);
        }
        Ok(Self { warehouses })
    }

    pub fn warehouses(&self) -> &[Warehouse] {
        &self.warehouses
    }

    /// Picks the warehouse nearest to `destination`.
    ///
    /// Destinations missing either coordinate use the first warehouse.
    /// Distance ties keep the earlier catalog entry (strict less-than).
    pub fn pick_best(&self, destination: Option<&Address>) -> &Warehouse {
        let Some((lat, lng)) = destination.and_then(|address| address.coordinates()) else {
            return &self.warehouses[0];
        };

        let mut best = &self.warehouses[0];
        let mut best_distance = haversine_km(lat, lng, best.latitude, best.longitude);

        for warehouse in &self.warehouses[1..] {
            let distance = haversine_km(lat, lng, warehouse.latitude, warehouse.longitude);
            if distance < best_distance {
                best = warehouse;
                best_distance = distance;
            }
        }

        best
    }
}

impl Default for WarehouseSelector {
    fn default() -> Self {
        Self::new(builtin_catalog()).expect("built-in catalog is non-empty")
    }
}

/// The dispatch network. Johannesburg first: it is the fallback for
/// destinations without coordinates.
fn builtin_catalog() -> Vec<Warehouse> {
    let johannesburg = Address::new(
        "Unit 4, 24 Electron Avenue, Isando",
        "Johannesburg",
        "GP",
        "ZA",
        "1601",
    )
    .expect("catalog address is valid");
    let cape_town = Address::new(
        "9 Racecourse Road, Milnerton",
        "Cape Town",
        "WC",
        "ZA",
        "7441",
    )
    .expect("catalog address is valid");

    vec![
        Warehouse::new(
            "jnb",
            "Johannesburg Fulfilment Centre",
            johannesburg,
            -26.2041,
            28.0473,
        )
        .expect("catalog coordinates are in range"),
        Warehouse::new(
            "cpt",
            "Cape Town Fulfilment Centre",
            cape_town,
            -33.9249,
            18.4241,
        )
        .expect("catalog coordinates are in range"),
    ]
}
