use std::path::PathBuf;

use chrono::NaiveDate;

use crate::color::ColorMap;
use crate::data::error::LoadError;
use crate::data::filter::{indices_in_interval, stations_in, DateInterval, Filters};
use crate::data::model::{ObservationTable, StationKey};
use crate::data::pipeline::{evaluate, Evaluation, Selections};
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Session – one loaded file and everything chosen for it
// ---------------------------------------------------------------------------

/// Created when a file is loaded and replaced wholesale by the next load.
pub struct Session {
    pub source: PathBuf,
    pub table: ObservationTable,
    /// Full date range of the table; the interval is always kept inside it.
    pub bounds: DateInterval,
    pub selections: Selections,
    /// Stations present in the current date interval (selectable options).
    pub station_options: Vec<StationKey>,
    /// Latest pipeline output.
    pub evaluation: Evaluation,
    /// Station colours shared by the map and the scatter plot.
    pub station_colors: ColorMap,
}

impl Session {
    /// Start a session with the defaults: whole date range, every station,
    /// first parameter for every chart.
    pub fn new(source: PathBuf, table: ObservationTable) -> Option<Self> {
        let bounds = DateInterval::spanning(&table)?;
        let parameters = table.numeric_parameters();
        let first = parameters.first().cloned();

        let all: Vec<usize> = (0..table.len()).collect();
        let station_colors = ColorMap::new(&stations_in(&table, &all));

        let mut session = Session {
            source,
            table,
            bounds,
            selections: Selections {
                filters: Filters {
                    interval: bounds,
                    stations: Default::default(),
                },
                bar_parameter: first.clone(),
                x_axis: first.clone(),
                y_axis: first,
            },
            station_options: Vec::new(),
            evaluation: Evaluation::default(),
            station_colors,
        };
        session.reset_stations();
        Some(session)
    }

    /// Re-run the whole pipeline.
    pub fn refresh(&mut self) {
        self.evaluation = evaluate(&self.table, &self.selections);
    }

    /// Stations offered for the current interval, all selected.
    fn reset_stations(&mut self) {
        let in_range = indices_in_interval(&self.table, &self.selections.filters.interval);
        self.station_options = stations_in(&self.table, &in_range);
        self.selections.filters.stations = self.station_options.iter().cloned().collect();
        self.refresh();
    }

    /// Change the date interval. The new range is clamped to the table's dates;
    /// an inverted range (start after end) is ignored. The station choice goes
    /// back to every station present in the new range.
    pub fn set_interval(&mut self, start: NaiveDate, end: NaiveDate) {
        let Some(interval) = DateInterval::new(start, end) else {
            log::debug!("Ignoring inverted interval {start} .. {end}");
            return;
        };
        let interval = interval.clamped_to(&self.bounds);
        if interval == self.selections.filters.interval {
            return;
        }
        self.selections.filters.interval = interval;
        self.reset_stations();
    }

    /// Toggle a single station in the selection.
    pub fn toggle_station(&mut self, station: &StationKey) {
        let selected = &mut self.selections.filters.stations;
        if !selected.remove(station) {
            selected.insert(station.clone());
        }
        self.refresh();
    }

    /// Select every station offered for the current interval.
    pub fn select_all_stations(&mut self) {
        self.selections.filters.stations = self.station_options.iter().cloned().collect();
        self.refresh();
    }

    /// Deselect all stations.
    pub fn select_no_stations(&mut self) {
        self.selections.filters.stations.clear();
        self.refresh();
    }

    pub fn set_bar_parameter(&mut self, parameter: String) {
        self.selections.bar_parameter = Some(parameter);
        self.refresh();
    }

    pub fn set_x_axis(&mut self, column: String) {
        self.selections.x_axis = Some(column);
        self.refresh();
    }

    pub fn set_y_axis(&mut self, column: String) {
        self.selections.y_axis = Some(column);
        self.refresh();
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

pub const LOAD_SUCCESS: &str = "Dados carregados com sucesso!";

/// Outcome of the last file operation, shown in the top bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Success(String),
    Error(String),
}

impl Status {
    pub fn text(&self) -> &str {
        match self {
            Status::Success(t) | Status::Error(t) => t,
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    /// Current session (None until the user loads a file).
    pub session: Option<Session>,

    /// Status / error message shown in the UI.
    pub status_message: Option<Status>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            session: None,
            status_message: None,
        }
    }

    /// Load `path`, replacing the current session. On failure the previous
    /// session is dropped too and the error is kept for display.
    pub fn load(&mut self, path: PathBuf) {
        self.session = None;
        match crate::data::loader::load_file(&path, &self.settings.columns) {
            Ok(table) => {
                log::info!(
                    "Loaded {} readings with columns {:?}",
                    table.len(),
                    table.column_names
                );
                self.session = Session::new(path, table);
                self.status_message = Some(Status::Success(LOAD_SUCCESS.to_string()));
            }
            Err(e) => self.set_error(&e),
        }
    }

    fn set_error(&mut self, e: &LoadError) {
        log::error!("Failed to load file: {e}");
        self.status_message = Some(Status::Error(e.to_string()));
    }

    /// Forget the loaded file.
    pub fn clear(&mut self) {
        self.session = None;
        self.status_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::Warning;
    use crate::data::model::fixtures;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session() -> Session {
        let table = fixtures::table(&[
            ("2022-01-10", "E1", 2022.0, &[("pH", Some(7.0)), ("OD", Some(8.0))]),
            ("2022-07-10", "E2", 2022.0, &[("pH", Some(7.5)), ("OD", Some(7.0))]),
            ("2023-01-10", "E3", 2023.0, &[("pH", Some(6.5)), ("OD", Some(9.0))]),
        ]);
        Session::new(PathBuf::from("readings.xlsx"), table).unwrap()
    }

    #[test]
    fn defaults_select_everything_and_first_parameter() {
        let s = session();
        assert_eq!(s.selections.filters.interval, s.bounds);
        assert_eq!(s.selections.filters.stations.len(), 3);
        assert_eq!(s.selections.bar_parameter.as_deref(), Some("pH"));
        assert_eq!(s.evaluation.filtered, vec![0, 1, 2]);
        // Both scatter axes default to the first parameter.
        assert_eq!(s.evaluation.warnings, vec![Warning::IdenticalAxisSelection]);
    }

    #[test]
    fn narrowing_interval_resets_station_options() {
        let mut s = session();
        s.toggle_station(&Some("E1".to_string()));
        assert_eq!(s.evaluation.filtered, vec![1, 2]);

        s.set_interval(date(2022, 1, 1), date(2022, 12, 31));
        assert_eq!(
            s.station_options,
            vec![Some("E1".to_string()), Some("E2".to_string())]
        );
        assert_eq!(s.evaluation.filtered, vec![0, 1]);
    }

    #[test]
    fn interval_is_clamped_and_inversions_ignored() {
        let mut s = session();
        s.set_interval(date(2000, 1, 1), date(2022, 3, 1));
        assert_eq!(s.selections.filters.interval.start(), date(2022, 1, 10));

        let before = s.selections.filters.interval;
        s.set_interval(date(2023, 1, 1), date(2022, 1, 1));
        assert_eq!(s.selections.filters.interval, before);
    }

    #[test]
    fn axis_changes_reevaluate() {
        let mut s = session();
        s.set_y_axis("OD".to_string());
        assert!(s.evaluation.warnings.is_empty());
        assert_eq!(s.evaluation.correlation.unwrap().display(), "-1.00");

        s.select_no_stations();
        assert!(s.evaluation.filtered.is_empty());
        assert_eq!(s.evaluation.warnings, vec![Warning::InsufficientPairedRows]);

        s.select_all_stations();
        assert_eq!(s.evaluation.filtered.len(), 3);
    }

    #[test]
    fn failed_load_clears_session_and_reports() {
        let mut state = AppState::new(Settings::default());
        state.load(PathBuf::from("/nonexistent/readings.csv"));
        assert!(state.session.is_none());
        assert!(matches!(state.status_message, Some(Status::Error(_))));
    }

    #[test]
    fn successful_load_reports_success() {
        let path = std::env::temp_dir().join(format!(
            "water-dashboard-{}-state.csv",
            std::process::id()
        ));
        std::fs::write(&path, "Data,Estação,pH\n2023-01-10,E1,7.0\n").unwrap();

        let mut state = AppState::new(Settings::default());
        state.load(path.clone());
        std::fs::remove_file(&path).ok();

        assert!(state.session.is_some());
        assert_eq!(
            state.status_message,
            Some(Status::Success(LOAD_SUCCESS.to_string()))
        );

        state.clear();
        assert!(state.status_message.is_none());
    }
}
