use serde::{ser::SerializeMap, Serialize, Serializer};

use super::trip::{FuelType, Trip, TripStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    #[serde(rename = "InTransit")]
    pub in_transit: u64,
    #[serde(rename = "Completed")]
    pub completed: u64,
    #[serde(rename = "Cancelled")]
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn sum(&self) -> u64 {
        self.in_transit + self.completed + self.cancelled
    }
}

/// Fuel type occurrence counts, keyed in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuelHistogram(Vec<(FuelType, u64)>);

impl FuelHistogram {
    pub fn record(&mut self, fuel: FuelType) {
        match self.0.iter_mut().find(|(seen, _)| *seen == fuel) {
            Some((_, count)) => *count += 1,
            None => self.0.push((fuel, 1)),
        }
    }

    pub fn get(&self, fuel: FuelType) -> u64 {
        self.0
            .iter()
            .find(|(seen, _)| *seen == fuel)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn keys(&self) -> impl Iterator<Item = FuelType> + '_ {
        self.0.iter().map(|(fuel, _)| *fuel)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FuelHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (fuel, count) in &self.0 {
            map.serialize_entry(fuel.as_str(), count)?;
        }
        map.end()
    }
}

/// Aggregate over every stored trip. Never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatistics {
    pub total: u64,
    pub by_status: StatusCounts,
    pub total_liters: u64,
    pub by_fuel_type: FuelHistogram,
}

impl TripStatistics {
    pub fn tally<'a>(trips: impl IntoIterator<Item = &'a Trip>) -> Self {
        let mut stats = Self::default();
        for trip in trips {
            stats.total += 1;
            match trip.status {
                TripStatus::InTransit => stats.by_status.in_transit += 1,
                TripStatus::Completed => stats.by_status.completed += 1,
                TripStatus::Cancelled => stats.by_status.cancelled += 1,
            }
            stats.total_liters += u64::from(trip.liters);
            stats.by_fuel_type.record(trip.fuel_type);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn trip(fuel_type: FuelType, liters: u32, status: TripStatus) -> Trip {
        let now = Utc::now();
        Trip {
            id: uuid::Uuid::new_v4().to_string(),
            truck: "ABC123".into(),
            driver: "Juan Pérez".into(),
            origin: "Planta X".into(),
            destination: "Estación Y".into(),
            fuel_type,
            liters,
            departure_time: now + Duration::hours(1),
            status,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tally_reference_fleet() {
        let trips = vec![
            trip(FuelType::Diesel, 15_000, TripStatus::InTransit),
            trip(FuelType::Gasoline, 20_000, TripStatus::Completed),
            trip(FuelType::Cng, 12_000, TripStatus::Cancelled),
        ];

        let stats = TripStatistics::tally(&trips);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.total_liters, 47_000);
        assert_eq!(stats.by_status.sum(), stats.total);
        for fuel in FuelType::ALL {
            assert_eq!(stats.by_fuel_type.get(fuel), 1);
        }
    }

    #[test]
    fn histogram_keeps_first_seen_order() {
        let trips = vec![
            trip(FuelType::Cng, 1, TripStatus::InTransit),
            trip(FuelType::Diesel, 1, TripStatus::InTransit),
            trip(FuelType::Cng, 1, TripStatus::InTransit),
        ];

        let stats = TripStatistics::tally(&trips);

        let keys: Vec<_> = stats.by_fuel_type.keys().collect();
        assert_eq!(keys, vec![FuelType::Cng, FuelType::Diesel]);
        assert_eq!(stats.by_fuel_type.get(FuelType::Cng), 2);
        assert_eq!(stats.by_fuel_type.get(FuelType::Gasoline), 0);

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains(r#""byFuelType":{"CNG":2,"Diesel":1}"#), "{json}");
        assert!(json.contains(r#""byStatus":{"InTransit":3,"Completed":0,"Cancelled":0}"#));
    }

    #[test]
    fn empty_fleet_yields_zeroes() {
        let stats = TripStatistics::tally(&Vec::new());
        assert_eq!(stats, TripStatistics::default());
        assert!(stats.by_fuel_type.is_empty());
    }
}
