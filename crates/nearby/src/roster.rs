/// Labels of the devices currently visible nearby, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NearbyDeviceRoster {
    labels: Vec<String>,
}

impl NearbyDeviceRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label unless it is already listed. Returns whether it was added.
    pub fn insert(&mut self, label: &str) -> bool {
        if self.contains(label) {
            return false;
        }
        self.labels.push(label.to_string());
        true
    }

    /// Remove the first matching label. Returns whether one was removed.
    pub fn remove(&mut self, label: &str) -> bool {
        match self.labels.iter().position(|l| l == label) {
            Some(index) => {
                self.labels.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut roster = NearbyDeviceRoster::new();
        assert!(roster.insert("Pixel-7"));
        assert!(!roster.insert("Pixel-7"));
        assert_eq!(roster.labels(), ["Pixel-7"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut roster = NearbyDeviceRoster::new();
        roster.insert("a");
        roster.insert("b");
        roster.insert("c");

        assert!(roster.remove("b"));
        assert!(!roster.remove("b"));
        assert_eq!(roster.labels(), ["a", "c"]);
    }
}
