quantity!(EurocentsPerMegawattHour, via: i64, suffix: "c/MWh", precision: 0);
