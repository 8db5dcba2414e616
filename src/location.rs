//! City search and reverse geocoding, backed by the lookup cache.

use std::time::Duration;

use crate::cache::{city_key, coords_key, Cache};
use crate::error::{ClimaError, CoreError};
use crate::owm::geocoding::Place;
use crate::owm::Client;

/// Queries shorter than this produce no suggestions
pub const MIN_SUGGESTION_CHARS: usize = 3;
pub const MAX_SUGGESTIONS: u8 = 5;

/// Forward and reverse geocoding
pub trait Geocoder {
    fn direct(&self, query: &str, limit: u8) -> crate::Result<Vec<Place>>;
    fn reverse(&self, lat: f64, lon: f64) -> crate::Result<Vec<Place>>;
}

impl Geocoder for Client {
    fn direct(&self, query: &str, limit: u8) -> crate::Result<Vec<Place>> {
        Ok(Client::direct(self, query, limit)?)
    }

    fn reverse(&self, lat: f64, lon: f64) -> crate::Result<Vec<Place>> {
        Ok(Client::reverse(self, lat, lon)?)
    }
}

pub struct Locator<'a, G: Geocoder> {
    geocoder: &'a G,
    cache: &'a mut Cache,
    ttl: Duration,
}

impl<'a, G: Geocoder> Locator<'a, G> {
    pub fn new(geocoder: &'a G, cache: &'a mut Cache, ttl: Duration) -> Self {
        Self { geocoder, cache, ttl }
    }

    /// Resolves a free-text city to its best match
    pub fn resolve_city(&mut self, query: &str) -> crate::Result<Place> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::invalid_input("please enter a city").into());
        }

        let key = city_key(query);
        if let Some(place) = self.cache.get::<Place>(&key)? {
            tracing::debug!(query, "city resolved from cache");
            return Ok(place);
        }

        let place = self
            .geocoder
            .direct(query, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| ClimaError::not_found(query))?;
        tracing::info!(
            query,
            normalized = %place.display_name(),
            lat = place.lat,
            lon = place.lon,
            "city resolved"
        );
        self.cache.put(&key, &place, self.ttl)?;
        Ok(place)
    }

    /// Up to five matches for a partially typed city name
    pub fn suggestions(&self, query: &str) -> crate::Result<Vec<Place>> {
        let query = query.trim();
        if query.chars().count() < MIN_SUGGESTION_CHARS {
            return Ok(Vec::new());
        }
        let places = self.geocoder.direct(query, MAX_SUGGESTIONS)?;
        tracing::debug!(query, count = places.len(), "suggestions");
        Ok(places)
    }

    /// Human-readable place name for coordinates, `None` if the lookup fails
    pub fn city_for_coords(&mut self, lat: f64, lon: f64) -> Option<String> {
        let key = coords_key(lat, lon);
        match self.cache.get::<String>(&key) {
            Ok(Some(name)) => return Some(name),
            Ok(None) => {}
            Err(e) => tracing::warn!("cache lookup failed: {e}"),
        }

        let name = match self.geocoder.reverse(lat, lon) {
            Ok(places) => places.first().map(Place::display_name)?,
            Err(e) => {
                tracing::warn!(lat, lon, "reverse geocoding failed: {e}");
                return None;
            }
        };
        if let Err(e) = self.cache.put(&key, &name, self.ttl) {
            tracing::warn!("cache store failed: {e}");
        }
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct FakeGeocoder {
        places: Vec<Place>,
        calls: Cell<usize>,
    }

    impl FakeGeocoder {
        fn new(places: Vec<Place>) -> Self {
            Self {
                places,
                calls: Cell::new(0),
            }
        }
    }

    impl Geocoder for FakeGeocoder {
        fn direct(&self, _query: &str, limit: u8) -> crate::Result<Vec<Place>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.places.iter().take(usize::from(limit)).cloned().collect())
        }

        fn reverse(&self, _lat: f64, _lon: f64) -> crate::Result<Vec<Place>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.places.iter().take(1).cloned().collect())
        }
    }

    fn place(name: &str) -> Place {
        Place {
            name: name.to_string(),
            state: None,
            country: "AR".to_string(),
            lat: -31.0,
            lon: -64.0,
        }
    }

    const TTL: Duration = Duration::from_secs(3600);

    #[test]
    fn test_resolve_city_uses_cache() {
        let geocoder = FakeGeocoder::new(vec![place("Salta")]);
        let mut cache = Cache::in_memory();
        let mut locator = Locator::new(&geocoder, &mut cache, TTL);

        assert_eq!(locator.resolve_city("salta").unwrap().name, "Salta");
        assert_eq!(locator.resolve_city(" SALTA ").unwrap().name, "Salta");
        assert_eq!(geocoder.calls.get(), 1);
    }

    #[test]
    fn test_resolve_city_not_found() {
        let geocoder = FakeGeocoder::new(vec![]);
        let mut cache = Cache::in_memory();
        let mut locator = Locator::new(&geocoder, &mut cache, TTL);
        assert!(matches!(locator.resolve_city("Atlantis"), Err(ClimaError::NotFound { .. })));
    }

    #[test]
    fn test_resolve_blank_city_is_invalid() {
        let geocoder = FakeGeocoder::new(vec![place("Salta")]);
        let mut cache = Cache::in_memory();
        let mut locator = Locator::new(&geocoder, &mut cache, TTL);
        assert!(matches!(
            locator.resolve_city("   "),
            Err(ClimaError::Core(CoreError::InvalidInput(_)))
        ));
        assert_eq!(geocoder.calls.get(), 0);
    }

    #[test]
    fn test_short_queries_have_no_suggestions() {
        let geocoder = FakeGeocoder::new((0..8).map(|i| place(&format!("City {i}"))).collect());
        let mut cache = Cache::in_memory();
        let locator = Locator::new(&geocoder, &mut cache, TTL);

        assert!(locator.suggestions("Sa").unwrap().is_empty());
        assert_eq!(geocoder.calls.get(), 0);
        assert_eq!(locator.suggestions("San").unwrap().len(), usize::from(MAX_SUGGESTIONS));
    }

    #[test]
    fn test_city_for_coords_is_cached() {
        let geocoder = FakeGeocoder::new(vec![Place {
            state: Some("Mendoza".to_string()),
            ..place("Godoy Cruz")
        }]);
        let mut cache = Cache::in_memory();
        let mut locator = Locator::new(&geocoder, &mut cache, TTL);

        let name = locator.city_for_coords(-32.921, -68.846);
        assert_eq!(name.as_deref(), Some("Godoy Cruz, Mendoza, AR"));
        let again = locator.city_for_coords(-32.919, -68.849);
        assert_eq!(again, name);
        assert_eq!(geocoder.calls.get(), 1);
    }

    #[test]
    fn test_city_for_coords_without_result() {
        let geocoder = FakeGeocoder::new(vec![]);
        let mut cache = Cache::in_memory();
        let mut locator = Locator::new(&geocoder, &mut cache, TTL);
        assert_eq!(locator.city_for_coords(0.0, 0.0), None);
    }
}
