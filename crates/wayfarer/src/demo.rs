//! Canned itineraries served when no model is available.

const DUBAI_ITINERARY: &str = "\
## Weather Information
Temperature: 28°C - Sunny
Humidity: 65%
Wind: 15 km/h

## Hotel Recommendations
- Burj Khalifa Hotel: 450 AED/night
- Atlantis Hotel: 380 AED/night
- Jumeirah Hotel: 320 AED/night

## Tourist Attractions
- Burj Khalifa: 150 AED
- Dubai Mall: Free
- Dubai Fountain: Free
- Palm Island: 200 AED

## Daily Itinerary
Day 1:
- Morning: Visit Burj Khalifa
- Afternoon: Dubai Mall shopping
- Evening: Dubai Fountain

Day 2:
- Morning: Palm Island
- Afternoon: Jumeirah Beach
- Evening: Dinner at Dubai Marina

Day 3:
- Morning: Dubai Museum
- Afternoon: Gold Souk
- Evening: Dubai Airport

## Cost Calculation
- Hotels: 450 × 3 = 1,350 AED
- Food: 200 × 3 = 600 AED
- Attractions: 350 AED
- Transportation: 300 AED
- Total: 2,600 AED

## YouTube Resources
- Dubai Travel Guide
- Best Places in Dubai
- Dubai Travel Tips";

const GENERIC_PLAN: &str = "\
## Travel Plan

### Accommodation
- 4-star hotel: 300-500 AED/night
- 5-star hotel: 500-800 AED/night

### Food
- Regular meal: 50-100 AED
- Fine dining: 100-200 AED

### Transportation
- Taxi: 20-50 AED
- Metro: 5-15 AED
- Bus: 3-10 AED

### Important Tips
- Book hotels in advance
- Pack light clothes
- Use Dubai Metro app
- Try local cuisine

Note: This is a demo version. For accurate information, you need a valid OpenAI API key.";

/// Returns the demo answer for `query`.
///
/// Queries mentioning Dubai, in English or Arabic, get a full itinerary;
/// everything else gets a generic plan.
pub fn demo_response(query: &str) -> &'static str {
    let query = query.to_lowercase();
    if query.contains("dubai") || query.contains("دبي") {
        DUBAI_ITINERARY
    } else {
        GENERIC_PLAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dubai_matches_case_insensitively() {
        assert_eq!(demo_response("3 days in DUBAI please"), DUBAI_ITINERARY);
        assert_eq!(demo_response("رحلة إلى دبي"), DUBAI_ITINERARY);
    }

    #[test]
    fn test_other_destinations() {
        let plan = demo_response("Goa for 5 days");
        assert!(plan.starts_with("## Travel Plan"));
        assert!(plan.ends_with("you need a valid OpenAI API key."));
    }
}
