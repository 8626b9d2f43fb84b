//! User-facing reply texts.
//!
//! Every message the engine can send is built here so wording changes never
//! touch routing or resolution logic.

use crate::format::title_case;
use crate::keywords::{GREETING_SET, HOW_ARE_YOU_SET, THANKS_SET};
use crate::weather::Weather;

/// Above this temperature (°C) the weather advisory warns about heat.
pub const HOT_ABOVE_C: f64 = 30.0;

/// Below this temperature (°C) the weather advisory suggests a jacket.
pub const COOL_BELOW_C: f64 = 20.0;

pub const INTERNAL_ERROR: &str = "Sorry, I encountered an error. Please try again.";

const WELCOME: &str = "Welcome to your scheduling assistant!\n\n\
I can help you with:\n\
- Scheduling activities: I'll check the weather and create calendar events\n\
- Weather queries: current conditions and forecasts\n\n\
Examples:\n\
- \"I want to go for a run at 4pm this Saturday\"\n\
- \"Schedule a picnic tomorrow at 2pm\"\n\
- \"What's the weather like this Saturday 12pm?\"\n\
- \"How's the weather in Tokyo tomorrow?\"";

/// The `/start` greeting, naming the location used when none is given.
pub fn welcome(default_location: &str) -> String {
    format!("{WELCOME}\n\nI default to {default_location} for weather unless you specify another location!")
}

const GREETING: &str = "Hello! I'm your scheduling assistant. I can help you:\n\n\
- Schedule activities: just tell me what you want to do and when!\n\
- Check weather: ask about the weather for any location\n\n\
Examples:\n\
- 'I want to go for a run tomorrow at 3pm'\n\
- 'Schedule a meeting this Friday at 2pm'\n\
- 'What's the weather like tomorrow?'\n\n\
How can I help you today?";

const HOW_ARE_YOU: &str = "I'm doing great, thank you! I'm here and ready to help you schedule \
activities and check the weather. What would you like to plan today?";

const THANKS: &str = "You're very welcome! Feel free to ask me anytime if you need help \
scheduling activities or checking the weather!";

const CASUAL_DEFAULT: &str = "I'm your scheduling assistant! I can help you schedule activities \
and check weather forecasts.\n\n\
Try asking me:\n\
- 'Schedule a workout tomorrow at 6pm'\n\
- 'What's the weather like this weekend?'\n\
- 'I want to have a picnic on Saturday'\n\n\
What would you like to plan?";

const UNCLEAR_REQUEST: &str = "I'm not sure I understood what you'd like to do. Could you please \
be more specific?\n\n\
For scheduling:\n\
- 'I want to go for a run at 4pm this Saturday'\n\
- 'Schedule a picnic tomorrow at 2pm'\n\
- 'Plan a bike ride next Tuesday morning'\n\n\
For weather queries:\n\
- 'What's the weather like tomorrow?'\n\
- 'How's the weather this Saturday 3pm?'";

const WEATHER_CHOICES: &str = "1. Proceed anyway\n2. Reschedule to a different time\n3. Cancel the activity";

const TIME_EXAMPLES: &str = "For example:\n- '3pm'\n- '2:30 in the afternoon'\n- '9 in the morning'\n- 'around lunchtime'";

/// Canned reply for casual conversation, chosen by keyword tables in order:
/// greeting, how-are-you, thanks, then a generic introduction.
pub fn casual(raw_message: &str) -> &'static str {
    if GREETING_SET.matches(raw_message) {
        GREETING
    } else if HOW_ARE_YOU_SET.matches(raw_message) {
        HOW_ARE_YOU
    } else if THANKS_SET.matches(raw_message) {
        THANKS
    } else {
        CASUAL_DEFAULT
    }
}

pub fn unclear_request() -> &'static str {
    UNCLEAR_REQUEST
}

pub fn rainy_weather(description: &str, activity: &str, when: &str) -> String {
    format!(
        "The weather forecast shows {description} for your planned {activity} on {when}. \
         Would you like to:\n\n{WEATHER_CHOICES}\n\nPlease let me know what you'd prefer!"
    )
}

pub fn weather_choice_reprompt() -> String {
    format!(
        "I didn't quite understand. Please choose:\n\n{WEATHER_CHOICES}\n\n\
         Or just type 'proceed', 'reschedule', or 'cancel'."
    )
}

pub fn time_question(activity: &str, date: &str) -> String {
    format!(
        "I see you want to {activity} on {date}, but what time would you prefer?\n\n{TIME_EXAMPLES}"
    )
}

pub fn time_not_understood(activity: &str, date: &str) -> String {
    format!("I couldn't understand the time. {}", time_question(activity, date))
}

pub fn scheduled(activity: &str, when: &str) -> String {
    format!("Great! I've scheduled '{activity}' for {when}. The weather looks good!")
}

pub fn scheduled_despite_weather(activity: &str, when: &str) -> String {
    format!("Great! I've scheduled '{activity}' for {when} despite the weather. Stay safe!")
}

pub fn calendar_failed() -> &'static str {
    "Sorry, I couldn't create the calendar event. Please try again."
}

pub fn reschedule_prompt() -> &'static str {
    "I'd be happy to help you reschedule! Please tell me when you'd prefer to do this activity instead."
}

pub fn cancelled(activity: &str) -> String {
    format!(
        "No problem! I've cancelled your {activity} plan. Let me know if you'd like to schedule something else!"
    )
}

pub fn weather_query_unclear() -> &'static str {
    "I couldn't understand your weather query. Please try again."
}

/// The one-line advisory attached to a weather report.
pub fn advisory(weather: &Weather) -> &'static str {
    if weather.is_rainy {
        "It's rainy - bring an umbrella!"
    } else if weather.temperature > HOT_ABOVE_C {
        "It's quite hot - stay hydrated!"
    } else if weather.temperature < COOL_BELOW_C {
        "It's cool - consider bringing a jacket!"
    } else {
        "Great weather for outdoor activities!"
    }
}

/// Full weather report: temperature, conditions, humidity, one advisory.
pub fn weather_report(location: &str, weather: &Weather) -> String {
    let mut report = format!("Weather for {}\n\n", title_case(location));
    report.push_str(&format!("Temperature: {:.1}°C", weather.temperature));
    if let Some(feels_like) = weather.feels_like {
        report.push_str(&format!(" (feels like {feels_like:.1}°C)"));
    }
    report.push_str(&format!(
        "\nConditions: {}\nHumidity: {}%\n",
        title_case(&weather.description),
        weather.humidity_pct
    ));
    report.push_str(&format!("\nAdvice: {}", advisory(weather)));
    report
}
