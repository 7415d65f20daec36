//! Funciones geográficas puras
//!
//! Distancia de gran círculo (haversine), rumbo, punto de destino y
//! bounding box para pre-filtrar candidatos antes del cálculo exacto.

/// Radio medio de la Tierra en kilómetros
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Tolerancia para que el límite del radio sea inclusivo pese al redondeo
pub const DISTANCE_EPSILON_KM: f64 = 1e-9;

/// Distancia haversine entre dos coordenadas, en kilómetros
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Rumbo inicial (0-360, norte = 0) desde el primer punto hacia el segundo
pub fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let y = delta_lon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Punto alcanzado desde (lat, lon) recorriendo `distance_km` con rumbo `bearing_deg`
pub fn destination_point(lat: f64, lon: f64, bearing_deg: f64, distance_km: f64) -> (f64, f64) {
    let delta = distance_km / EARTH_RADIUS_KM;
    let theta = bearing_deg.to_radians();
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    (phi2.to_degrees(), normalize_longitude(lambda2.to_degrees()))
}

/// Normaliza una longitud al rango [-180, 180]
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Longitud total de una traza GPS (ya ordenada), en kilómetros
pub fn path_length_km(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0].0, pair[0].1, pair[1].0, pair[1].1))
        .sum()
}

/// Caja de pre-filtrado alrededor de un punto.
///
/// Si la caja cruza el antimeridiano, `min_lon > max_lon` y la longitud
/// válida es la unión de ambos extremos.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Construye la caja que contiene el círculo de `radius_km` alrededor del punto
    pub fn around(lat: f64, lon: f64, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let delta_lat = angular.to_degrees() + 1e-9;
        let min_lat = (lat - delta_lat).max(-90.0);
        let max_lat = (lat + delta_lat).min(90.0);

        // Cerca de los polos cualquier longitud puede quedar dentro del radio
        let cos_lat = lat.to_radians().cos();
        if min_lat <= -90.0 || max_lat >= 90.0 || cos_lat < 1e-6 {
            return Self { min_lat, max_lat, min_lon: -180.0, max_lon: 180.0 };
        }

        let ratio = angular.sin() / cos_lat;
        if ratio >= 1.0 {
            return Self { min_lat, max_lat, min_lon: -180.0, max_lon: 180.0 };
        }
        let delta_lon = ratio.asin().to_degrees() + 1e-9;
        if delta_lon >= 180.0 {
            return Self { min_lat, max_lat, min_lon: -180.0, max_lon: 180.0 };
        }

        let mut min_lon = lon - delta_lon;
        let mut max_lon = lon + delta_lon;
        if min_lon < -180.0 {
            min_lon += 360.0;
        }
        if max_lon > 180.0 {
            max_lon -= 360.0;
        }

        Self { min_lat, max_lat, min_lon, max_lon }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lon > self.max_lon
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        if self.crosses_antimeridian() {
            lon >= self.min_lon || lon <= self.max_lon
        } else {
            lon >= self.min_lon && lon <= self.max_lon
        }
    }
}

/// Comprueba que una coordenada sea finita y esté en rango
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKYO_STATION: (f64, f64) = (35.681236, 139.767125);

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_same_point() {
        let (lat, lon) = TOKYO_STATION;
        assert_eq!(haversine_km(lat, lon, lat, lon), 0.0);
    }

    #[test]
    fn test_haversine_known_value() {
        // Estación de Tokio a Shinjuku, ~6.2 km
        let dist = haversine_km(35.681236, 139.767125, 35.690921, 139.700258);
        assert!(approx_eq(dist, 6.13, 0.2), "got {dist}");
    }

    #[test]
    fn test_destination_point_round_trips_distance() {
        let (lat, lon) = TOKYO_STATION;
        for bearing in [0.0, 45.0, 90.0, 200.0] {
            let (lat2, lon2) = destination_point(lat, lon, bearing, 1.0);
            assert!(approx_eq(haversine_km(lat, lon, lat2, lon2), 1.0, 1e-9));
        }
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let north = initial_bearing_deg(0.0, 0.0, 1.0, 0.0);
        let east = initial_bearing_deg(0.0, 0.0, 0.0, 1.0);
        assert!(approx_eq(north, 0.0, 1e-9));
        assert!(approx_eq(east, 90.0, 1e-9));
    }

    #[test]
    fn test_bounding_box_contains_circle() {
        let (lat, lon) = TOKYO_STATION;
        let bbox = BoundingBox::around(lat, lon, 1.0);
        for bearing in [0.0, 90.0, 180.0, 270.0] {
            let (lat2, lon2) = destination_point(lat, lon, bearing, 1.0);
            assert!(bbox.contains(lat2, lon2));
        }
        let (far_lat, far_lon) = destination_point(lat, lon, 0.0, 1.5);
        assert!(!bbox.contains(far_lat, far_lon));
    }

    #[test]
    fn test_bounding_box_antimeridian() {
        let bbox = BoundingBox::around(0.0, 179.995, 5.0);
        assert!(bbox.crosses_antimeridian());
        assert!(bbox.contains(0.0, -179.99));
        assert!(bbox.contains(0.0, 179.99));
        assert!(!bbox.contains(0.0, 0.0));
    }

    #[test]
    fn test_bounding_box_near_pole_covers_all_longitudes() {
        let bbox = BoundingBox::around(89.9999, 10.0, 50.0);
        assert_eq!(bbox.min_lon, -180.0);
        assert_eq!(bbox.max_lon, 180.0);
    }

    #[test]
    fn test_path_length() {
        let points = vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)];
        let expected = 2.0 * haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!(approx_eq(path_length_km(&points), expected, 1e-9));
        assert_eq!(path_length_km(&points[..1]), 0.0);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(is_valid_coordinate(90.0, -180.0));
        assert!(!is_valid_coordinate(200.0, 300.0));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
    }
}
