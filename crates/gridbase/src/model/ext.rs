//! Helper traits for reading and writing Loro containers.

use anyhow::Result;

/// Typed value extraction from a Loro map.
pub(crate) trait MapExt {
    /// Get a value from the map and apply a function to the LoroValue.
    /// Automatically unwraps the ValueOrContainer::Value variant.
    fn get_typed<T, F>(&self, key: &str, f: F) -> Option<T>
    where
        F: FnOnce(&loro::LoroValue) -> Option<T>;

    fn get_string(&self, key: &str) -> Option<String>;
    fn get_i64(&self, key: &str) -> Option<i64>;
    fn get_bool(&self, key: &str) -> Option<bool>;

    /// Child map container, if present.
    fn child_map(&self, key: &str) -> Option<loro::LoroMap>;
    /// Child list container, if present.
    fn child_list(&self, key: &str) -> Option<loro::LoroList>;

    fn get_or_create_map(&self, key: &str) -> Result<loro::LoroMap>;
    fn get_or_create_list(&self, key: &str) -> Result<loro::LoroList>;
}

impl MapExt for loro::LoroMap {
    fn get_typed<T, F>(&self, key: &str, f: F) -> Option<T>
    where
        F: FnOnce(&loro::LoroValue) -> Option<T>,
    {
        self.get(key).and_then(|v| match v {
            loro::ValueOrContainer::Value(val) => f(&val),
            _ => None,
        })
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get_typed(key, |val| val.as_string().map(|s| s.to_string()))
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_typed(key, |val| val.as_i64().copied())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_typed(key, |val| val.as_bool().copied())
    }

    fn child_map(&self, key: &str) -> Option<loro::LoroMap> {
        match self.get(key) {
            Some(loro::ValueOrContainer::Container(loro::Container::Map(m))) => Some(m),
            _ => None,
        }
    }

    fn child_list(&self, key: &str) -> Option<loro::LoroList> {
        match self.get(key) {
            Some(loro::ValueOrContainer::Container(loro::Container::List(l))) => Some(l),
            _ => None,
        }
    }

    fn get_or_create_map(&self, key: &str) -> Result<loro::LoroMap> {
        match self.get(key) {
            Some(loro::ValueOrContainer::Container(loro::Container::Map(m))) => Ok(m),
            Some(_) => Err(anyhow::anyhow!("Container '{}' is not a map", key)),
            None => Ok(self.insert_container(key, loro::LoroMap::new())?),
        }
    }

    fn get_or_create_list(&self, key: &str) -> Result<loro::LoroList> {
        match self.get(key) {
            Some(loro::ValueOrContainer::Container(loro::Container::List(l))) => Ok(l),
            Some(_) => Err(anyhow::anyhow!("Container '{}' is not a list", key)),
            None => Ok(self.insert_container(key, loro::LoroList::new())?),
        }
    }
}

/// Collection and search over Loro lists.
pub(crate) trait ListExt {
    /// Collect values by applying a function to each element, keeping only
    /// Some results.
    fn collect_map<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(loro::ValueOrContainer) -> Option<T>;

    /// Find the index of the first element where the function returns
    /// Some(true).
    fn find_index<F>(&self, f: F) -> Option<usize>
    where
        F: FnMut(loro::ValueOrContainer) -> Option<bool>;

    /// All elements that are string values, in order.
    fn collect_strings(&self) -> Vec<String>;

    /// Index of the given string value.
    fn index_of_str(&self, needle: &str) -> Option<usize>;

    /// All elements that are map containers, in order.
    fn child_maps(&self) -> Vec<loro::LoroMap>;

    /// Map container at the given index.
    fn map_at(&self, index: usize) -> Option<loro::LoroMap>;

    /// First map container whose "id" entry equals the given id.
    fn find_map_by_id(&self, id: &str) -> Option<(usize, loro::LoroMap)>;

    /// Remove the first occurrence of a string value. Returns whether an
    /// element was removed.
    fn remove_str(&self, needle: &str) -> Result<bool>;
}

impl ListExt for loro::LoroList {
    fn collect_map<T, F>(&self, mut f: F) -> Vec<T>
    where
        F: FnMut(loro::ValueOrContainer) -> Option<T>,
    {
        let mut result = Vec::new();
        self.for_each(|v| {
            if let Some(value) = f(v) {
                result.push(value);
            }
        });
        result
    }

    fn find_index<F>(&self, mut f: F) -> Option<usize>
    where
        F: FnMut(loro::ValueOrContainer) -> Option<bool>,
    {
        let mut index = 0;
        let mut found = None;
        self.for_each(|v| {
            if found.is_none() {
                if let Some(true) = f(v) {
                    found = Some(index);
                }
            }
            index += 1;
        });
        found
    }

    fn collect_strings(&self) -> Vec<String> {
        self.collect_map(|v| match v {
            loro::ValueOrContainer::Value(val) => val.as_string().map(|s| s.to_string()),
            _ => None,
        })
    }

    fn index_of_str(&self, needle: &str) -> Option<usize> {
        self.find_index(|v| match v {
            loro::ValueOrContainer::Value(val) => val.as_string().map(|s| s.as_ref() == needle),
            _ => None,
        })
    }

    fn child_maps(&self) -> Vec<loro::LoroMap> {
        self.collect_map(|v| match v {
            loro::ValueOrContainer::Container(loro::Container::Map(m)) => Some(m),
            _ => None,
        })
    }

    fn map_at(&self, index: usize) -> Option<loro::LoroMap> {
        match self.get(index) {
            Some(loro::ValueOrContainer::Container(loro::Container::Map(m))) => Some(m),
            _ => None,
        }
    }

    fn find_map_by_id(&self, id: &str) -> Option<(usize, loro::LoroMap)> {
        let index = self.find_index(|v| match v {
            loro::ValueOrContainer::Container(loro::Container::Map(m)) => {
                Some(m.get_string("id").as_deref() == Some(id))
            }
            _ => None,
        })?;
        self.map_at(index).map(|m| (index, m))
    }

    fn remove_str(&self, needle: &str) -> Result<bool> {
        match self.index_of_str(needle) {
            Some(index) => {
                self.delete(index, 1)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
