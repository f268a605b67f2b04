use std::sync::Arc;

use crate::{
    model::{ProfileLocations, UserProfile},
    storage::{self, KeyValueStore, PROFILE_KEY},
};

/// Fields to overwrite on [`ProfileStore::update_profile`]; `None` keeps
/// the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub locations: Option<ProfileLocations>,
}

/// Persisted user profile with favorite and home locations.
#[derive(Debug)]
pub struct ProfileStore {
    profile: UserProfile,
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { profile: UserProfile::default(), store }
    }

    /// Loads the stored profile; fields missing from the record keep their
    /// defaults, and an unreadable record yields the default profile.
    pub fn load(&mut self) {
        self.profile = storage::load_record(self.store.as_ref(), PROFILE_KEY).unwrap_or_default();
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn has_profile(&self) -> bool {
        self.profile.is_complete()
    }

    /// Shallow-merges `update` into the current profile and persists it.
    pub fn update_profile(&mut self, update: ProfileUpdate) {
        let ProfileUpdate { full_name, email, phone_number, locations } = update;
        if let Some(full_name) = full_name {
            self.profile.full_name = full_name;
        }
        if let Some(email) = email {
            self.profile.email = email;
        }
        if let Some(phone_number) = phone_number {
            self.profile.phone_number = phone_number;
        }
        if let Some(locations) = locations {
            self.profile.locations = locations;
        }
        self.save();
    }

    /// Back to the default profile; the stored record is deleted.
    pub fn reset_profile(&mut self) {
        self.profile = UserProfile::default();
        storage::forget(self.store.as_ref(), PROFILE_KEY);
    }

    /// Adds `location` unless an identical entry is already present.
    pub fn add_favorite_location(&mut self, location: &str) {
        let favorites = &mut self.profile.locations.favorite_locations;
        if favorites.iter().any(|f| f == location) {
            return;
        }
        favorites.push(location.to_string());
        self.save();
    }

    pub fn remove_favorite_location(&mut self, location: &str) {
        self.profile.locations.favorite_locations.retain(|f| f != location);
        self.save();
    }

    pub fn set_home_location(&mut self, location: &str) {
        self.profile.locations.home_location = Some(location.to_string());
        self.save();
    }

    fn save(&self) {
        storage::persist(self.store.as_ref(), PROFILE_KEY, &self.profile);
    }
}
