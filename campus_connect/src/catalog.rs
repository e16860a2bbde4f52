//! Campus Connect - Catalog
//!
//! Static communities and events shown in the app, plus substring search.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::favorites::FavoriteKind;

/// Fallback avatar / cover image
pub const DEFAULT_IMAGE_URL: &str = "https://i.ibb.co/tw4ktVk1/images.png";

/// Anything that can be favorited.
///
/// Stored favorite keys may be either the display name (older installs) or the
/// stable id, so both are exposed.
pub trait Favoritable {
    /// Category this entity is stored under
    const KIND: FavoriteKind;

    /// Display name (community name / event title)
    fn favorite_name(&self) -> &str;

    /// Stable identifier as a string
    fn favorite_id(&self) -> String;
}

/// Stable id derived from kind + display name, identical across launches
fn stable_id(kind: FavoriteKind, name: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("campusconnect:{}:{}", kind.as_str(), name).as_bytes(),
    )
}

fn matches_query(query: &str, name: &str, tags: &[String]) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    name.to_lowercase().contains(&query)
        || tags.iter().any(|t| t.to_lowercase().contains(&query))
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMUNITIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Community member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunityMember {
    pub name: String,
    pub image_url: String,
}

impl CommunityMember {
    pub fn new(name: &str, image_url: &str) -> Self {
        Self {
            name: name.into(),
            image_url: image_url.into(),
        }
    }
}

/// Student community
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub photo_url: String,
    pub tags: Vec<String>,
    pub description: String,
    pub leader: CommunityMember,
    pub members: Vec<CommunityMember>,
    pub skills: Vec<String>,
}

impl Community {
    pub fn new(
        name: &str,
        photo_url: &str,
        tags: &[&str],
        description: &str,
        leader: CommunityMember,
        members: Vec<CommunityMember>,
        skills: &[&str],
    ) -> Self {
        Self {
            id: stable_id(FavoriteKind::Community, name),
            name: name.into(),
            photo_url: photo_url.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: description.into(),
            leader,
            members,
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Members plus the leader
    pub fn total_members(&self) -> usize {
        self.members.len() + 1
    }
}

impl Favoritable for Community {
    const KIND: FavoriteKind = FavoriteKind::Community;

    fn favorite_name(&self) -> &str {
        &self.name
    }

    fn favorite_id(&self) -> String {
        self.id.to_string()
    }
}

/// Communities featured on the home screen
pub fn popular_communities() -> Vec<Community> {
    vec![
        Community::new(
            "Foss Community",
            DEFAULT_IMAGE_URL,
            &["Technology", "Coding", "Programming"],
            "A club for technology enthusiasts, focusing on coding and programming.",
            CommunityMember::new("Supun", "https://i.ibb.co/1Hz4W78/5873314.webp"),
            vec![
                CommunityMember::new("Ashan", "https://i.ibb.co/23gg7qzh/images.jpg"),
                CommunityMember::new("Gihan", "https://i.ibb.co/Gvp49GDk/images.jpg"),
                CommunityMember::new("Sapumal", DEFAULT_IMAGE_URL),
            ],
            &["Swift", "Java", "C++", "Python"],
        ),
        Community::new(
            "MS Club of Campus",
            "https://upload.wikimedia.org/wikipedia/commons/thumb/4/44/Microsoft_logo.svg/2048px-Microsoft_logo.svg.png",
            &["Photography", "Technology", "Coding"],
            "Explore the world of photography, from camera techniques to photo editing.",
            CommunityMember::new("Jane Smith", DEFAULT_IMAGE_URL),
            vec![
                CommunityMember::new("Eve", DEFAULT_IMAGE_URL),
                CommunityMember::new("Mallory", DEFAULT_IMAGE_URL),
                CommunityMember::new("Trudy", DEFAULT_IMAGE_URL),
            ],
            &["Photography", "Editing", "Camera Operation"],
        ),
        Community::new(
            "Leo Club of Campus",
            "https://cdn.vectorstock.com/i/1000v/56/98/lion-head-logo-template-vector-22025698.jpg",
            &["Acting", "Theater", "Performance"],
            "A club where aspiring actors can practice and perform theatrical plays.",
            CommunityMember::new("David Williams", DEFAULT_IMAGE_URL),
            vec![
                CommunityMember::new("Sophie", DEFAULT_IMAGE_URL),
                CommunityMember::new("Ryan", DEFAULT_IMAGE_URL),
                CommunityMember::new("Olivia", DEFAULT_IMAGE_URL),
            ],
            &["Acting", "Directing", "Playwriting", "Stage Design"],
        ),
    ]
}

/// Filter communities by case-insensitive match on name or tags
pub fn search_communities<'a>(communities: &'a [Community], query: &str) -> Vec<&'a Community> {
    communities
        .iter()
        .filter(|c| matches_query(query, &c.name, &c.tags))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Campus event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Date as shown on the card (YYYY/MM/DD)
    pub time: String,
    pub venue: String,
    pub tags: Vec<String>,
    pub photo_url: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: &str,
        description: &str,
        time: &str,
        venue: &str,
        tags: &[&str],
        photo_url: &str,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: stable_id(FavoriteKind::Event, title),
            title: title.into(),
            description: description.into(),
            time: time.into(),
            venue: venue.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            photo_url: photo_url.into(),
            latitude,
            longitude,
        }
    }
}

impl Favoritable for Event {
    const KIND: FavoriteKind = FavoriteKind::Event;

    fn favorite_name(&self) -> &str {
        &self.title
    }

    fn favorite_id(&self) -> String {
        self.id.to_string()
    }
}

/// Upcoming events
pub fn sample_events() -> Vec<Event> {
    vec![
        Event::new(
            "Campus's Got Talent by FESC",
            "A talent competition by the Faculty of Engineering Student Community highlighting student skills in music, dance, drama and more.",
            "2025/07/05",
            "Malabe Campus Grounds",
            &["Talent Show", "FESC", "Entertainment"],
            "https://i.ibb.co/Rk1f3XmJ/8212616.png",
            6.9147,
            79.9728,
        ),
        Event::new(
            "Campus Walk",
            "An annual walk to promote unity and well-being among students and staff, featuring music, charity fundraising, and fun activities.",
            "2025/08/15",
            "From Campus to Parliament Grounds",
            &["Walk", "Community", "Charity"],
            "https://i.ibb.co/kVw6G6zw/images.jpg",
            6.9147,
            79.9728,
        ),
        Event::new(
            "Blood Donation",
            "Organized by the Faculty of Computing Student Community, this drive encourages students to donate blood and support healthcare.",
            "2025/09/10",
            "New Academic Building Lobby",
            &["Health", "Charity", "FCSC"],
            "https://i.ibb.co/gMx8Dh3q/FCSC-organized-Annual-Blood-Donation-Campaign-Drops-of-hope24.jpg",
            6.9147,
            79.9728,
        ),
    ]
}

/// Filter events by case-insensitive match on title or tags
pub fn search_events<'a>(events: &'a [Event], query: &str) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|e| matches_query(query, &e.title, &e.tags))
        .collect()
}
