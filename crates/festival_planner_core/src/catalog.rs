//! crates/festival_planner_core/src/catalog.rs
//!
//! The static event list served when no live source produces anything.

use chrono::NaiveDate;

use crate::domain::{BusStop, Category, Coordinates, Event, ParkingLot, TransportInfo};

/// Centre of the city map (Busan City Hall).
pub const CITY_CENTER: Coordinates = Coordinates {
    lat: 35.1795543,
    lng: 129.0756416,
};

pub const CITY_NAME: &str = "Busan";

/// Catalog entries restricted to one category.
pub fn fallback_events(category: Category) -> Vec<Event> {
    all_events()
        .into_iter()
        .filter(|event| event.category == category)
        .collect()
}

pub fn all_events() -> Vec<Event> {
    vec![
        Entry {
            id: "1",
            title: "2025 Gwangalli Drone Light Show",
            dates: ("2025-11-22", "2025-11-22"),
            location: "Gwangalli Beach",
            image: "https://picsum.photos/id/16/400/500",
            category: Category::Festival,
            description: "A drone show over the sea every Saturday. This week features a special performance themed on autumn in Busan.",
            price: "Free",
            cast: "500 drones",
            at: (35.1532, 129.1186),
            parking: &[
                ("Gwangalli Public Parking", "Public", "17 Namcheonbada-ro 33beon-gil, Suyeong-gu"),
                ("Millak Reclaimed Land Public Parking", "Public", "36 Millaksubyeon-ro 17beon-gil, Suyeong-gu"),
                ("Suyeong-gu Office Parking", "Government", "148-15 Namcheon-dong, Suyeong-gu"),
            ],
            subway: "Line 2 Geumnyeonsan Stn. exit 3 (10 min walk), Gwangan Stn. exit 3 (15 min walk)",
            bus: &[
                ("Gwangalli Beach", &["41", "42", "108-1", "38"]),
                ("Gwangan Station", &["20", "39", "51", "131"]),
            ],
        },
        Entry {
            id: "2",
            title: "Magic in Taejongdae",
            dates: ("2025-11-15", "2025-11-16"),
            location: "Taejongdae Drive-in Theater",
            image: "https://picsum.photos/id/28/400/500",
            category: Category::Festival,
            description: "Urban camping with films, live shows and a sweet potato party under the Taejongdae night sky.",
            price: "Admission 10,000 KRW (films extra)",
            cast: "Magician Lee Eun-gyeol, indie bands",
            at: (35.0518, 129.0858),
            parking: &[
                ("Taejongdae Resort Parking", "Paid", "24 Jeonmang-ro, Yeongdo-gu"),
                ("Freeland Public Parking", "Public", "100 Dongsam-dong, Yeongdo-gu"),
            ],
            subway: "Line 1 Nampo Stn. exit 6, then bus 8, 30 or 186",
            bus: &[
                ("Taejongdae (terminus)", &["8", "30", "66", "88", "101", "186"]),
                ("Taejongdae Hot Spring", &["8", "30", "88"]),
            ],
        },
        Entry {
            id: "3",
            title: "The Busan Illustration Fair V.6",
            dates: ("2025-11-01", "2025-11-04"),
            location: "BEXCO",
            image: "https://picsum.photos/id/58/400/500",
            category: Category::Performance,
            description: "The largest illustration fair in Busan, with illustrators from across the country showing work and goods.",
            price: "Adults 12,000 KRW / Youth 8,000 KRW",
            cast: "300 participating artists",
            at: (35.1691, 129.1361),
            parking: &[
                ("BEXCO Exhibition Hall 1 Underground", "Paid", "55 APEC-ro, Haeundae-gu"),
                ("BEXCO Exhibition Hall 2", "Paid", "30 APEC-ro, Haeundae-gu"),
                ("Busan Museum of Art Parking", "Paid", "58 APEC-ro, Haeundae-gu"),
            ],
            subway: "Line 2 Centum City Stn. exit 1 (1 min walk) or BEXCO Stn. exit 7",
            bus: &[
                ("BEXCO", &["5-1", "39", "40", "63", "100", "115-1", "141", "155"]),
                ("Centum City Stn. BEXCO", &["31", "100", "200", "307"]),
            ],
        },
        Entry {
            id: "4",
            title: "20th Busan Fireworks Festival",
            dates: ("2025-11-15", "2025-11-15"),
            location: "Gwangalli Beach",
            image: "https://picsum.photos/id/68/400/500",
            category: Category::Festival,
            description: "Fireworks over the autumn sea. The 20th anniversary brings the largest multimedia fireworks show yet.",
            price: "Free (some paid seating)",
            cast: "-",
            at: (35.1532, 129.1186),
            parking: &[],
            subway: "Line 2 Gwangan Stn. exits 3 and 5 or Geumnyeonsan Stn. exits 3 and 5 (15 min walk)",
            bus: &[
                ("Traffic control zone", &["Buses detour on the event day"]),
                ("Suyeong Middle School", &["42", "49", "62", "83", "108"]),
            ],
        },
        Entry {
            id: "5",
            title: "Busan Philharmonic Subscription Concert",
            dates: ("2025-11-20", "2025-11-20"),
            location: "Busan Cultural Center",
            image: "https://picsum.photos/id/106/400/500",
            category: Category::Performance,
            description: "Autumn classics by Tchaikovsky and Rachmaninoff performed by the Busan Philharmonic Orchestra.",
            price: "R 50,000 KRW / S 30,000 KRW / A 10,000 KRW",
            cast: "Conductor Hong Gil-dong, pianist Kim Cheol-su",
            at: (35.1294, 129.0936),
            parking: &[("Busan Cultural Center Parking", "Free (4 hours)", "848-4 Daeyeon-dong, Nam-gu")],
            subway: "Line 2 Daeyeon Stn. exits 3 and 5 (15 min walk)",
            bus: &[
                ("Cultural Center", &["Nam-gu 9", "Nam-gu 10"]),
                ("Seokpo Elementary School", &["51", "68", "134", "138"]),
            ],
        },
        Entry {
            id: "6",
            title: "Masters of Modern Art",
            dates: ("2025-11-01", "2025-11-30"),
            location: "Busan Museum of Art",
            image: "https://picsum.photos/id/204/400/500",
            category: Category::Performance,
            description: "Original works by Picasso, Matisse and other masters of modern art in one special exhibition.",
            price: "Adults 15,000 KRW / Youth 10,000 KRW",
            cast: "-",
            at: (35.1692, 129.1385),
            parking: &[
                ("Busan Museum of Art Parking", "Paid", "58 APEC-ro, Haeundae-gu"),
                ("BEXCO Exhibition Hall 2", "Paid", "30 APEC-ro, Haeundae-gu"),
            ],
            subway: "Line 2 BEXCO Stn. exit 5",
            bus: &[
                ("Olympic Intersection Transfer Center", &["31", "39", "40", "63", "100", "100-1", "115-1"]),
                ("BEXCO Station", &["5-1", "155", "307"]),
            ],
        },
    ]
    .into_iter()
    .filter_map(Entry::into_event)
    .collect()
}

struct Entry {
    id: &'static str,
    title: &'static str,
    dates: (&'static str, &'static str),
    location: &'static str,
    image: &'static str,
    category: Category,
    description: &'static str,
    price: &'static str,
    cast: &'static str,
    at: (f64, f64),
    parking: &'static [(&'static str, &'static str, &'static str)],
    subway: &'static str,
    bus: &'static [(&'static str, &'static [&'static str])],
}

impl Entry {
    fn into_event(self) -> Option<Event> {
        let date_start = NaiveDate::parse_from_str(self.dates.0, "%Y-%m-%d").ok()?;
        let date_end = NaiveDate::parse_from_str(self.dates.1, "%Y-%m-%d").ok()?;
        Some(Event {
            id: self.id.to_string(),
            title: self.title.to_string(),
            location: self.location.to_string(),
            date_start,
            date_end,
            category: self.category,
            description: self.description.to_string(),
            image_url: self.image.to_string(),
            price: Some(self.price.to_string()),
            cast: Some(self.cast.to_string()),
            coordinates: Some(Coordinates {
                lat: self.at.0,
                lng: self.at.1,
            }),
            transport: Some(TransportInfo {
                parking: self
                    .parking
                    .iter()
                    .map(|(name, kind, address)| ParkingLot {
                        name: name.to_string(),
                        kind: kind.to_string(),
                        address: address.to_string(),
                    })
                    .collect(),
                subway: Some(self.subway.to_string()),
                bus: self
                    .bus
                    .iter()
                    .map(|(stop, routes)| BusStop {
                        stop_name: stop.to_string(),
                        routes: routes.iter().map(|r| r.to_string()).collect(),
                    })
                    .collect(),
            }),
        })
    }
}
