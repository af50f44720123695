//! Built-in monitoring zone: the Tel Aviv / Beirut FIR and its western extension
//!
//! All rings are `(latitude, longitude)` pairs in degrees.

/// Combined Israel / Lebanon flight information region
pub const FIR_ISRAEL_LEBANON: &[(f64, f64)] = &[
    (29.497947360303073, 34.908275156555334),
    (31.329339969530665, 34.21029232109166),
    (31.589425393121473, 34.49072634540431),
    (31.941503679570886, 34.70830143972506),
    (32.407662626316295, 34.86889040267292),
    (32.832098274924775, 34.95898469078031),
    (32.80534795225661, 35.02976129808468),
    (32.89820828718409, 35.08499128329095),
    (33.11633622431158, 35.11017639210564),
    (33.89469885466238, 35.477228929423035),
    (33.97481232004101, 35.640242505346464),
    (34.16384450844703, 35.63354392435795),
    (34.45060453318487, 35.81360332859384),
    (34.53582087990101, 35.99181517063113),
    (34.647970885362014, 35.98338458549688),
    (34.63533472514111, 36.45464286637119),
    (34.50155447983009, 36.332752308772),
    (34.50157134832996, 36.43621800908463),
    (34.210287180919465, 36.614254701912415),
    (34.04072878028593, 36.4804417133731),
    (34.06037427475475, 36.41248533984168),
    (33.913324049795264, 36.27071188120212),
    (33.853336869797474, 36.38716438201038),
    (33.81916676830849, 36.38271224285734),
    (33.81485224403829, 36.06755999175235),
    (33.6409668597107, 35.9408903716712),
    (33.58065705743239, 36.056989815843),
    (33.522434307886, 36.01832269359028),
    (33.51875716539536, 35.94550403158806),
    (33.46863669975288, 35.95027840716412),
    (33.33186017517281, 35.791603708095806),
    (33.238350365084756, 35.62268474841963),
    (33.28530541438188, 35.56949380529451),
    (31.76427808144338, 35.5692469481142),
    (31.242125340800044, 35.39618915868624),
    (31.150855011741584, 35.449423272509904),
    (29.543104601511573, 34.978934170293),
    (29.49676762753704, 34.90813906153173),
];

/// Eastern Mediterranean approach corridor added to the buffered FIR
pub const WESTERN_EXTENSION: &[(f64, f64)] = &[
    (31.339812351430325, 34.20634481895593),
    (33.58318872508595, 28.535817148342147),
    (36.753542633847744, 30.60478325597461),
    (34.63987835805429, 35.99056253743524),
    (31.339812351430325, 34.20634481895593),
];

pub const DEFAULT_BUFFER_KM: f64 = 200.0;

pub const DEFAULT_ZONE_LABEL: &str = "Israel / Lebanon";

pub const DEFAULT_WATCHLIST: &[&str] = &[
    "AFR966", "AFR963", "AFR564", "AFR565", "DLH686", "DLH690", "DLH687", "DLH691", "DLH8351",
    "DLH681", "DLH683", "DLH8290", "DLH8350", "DLH680", "DLH682", "BAW404", "BAW405", "SWR252B",
    "SWR253", "ELY011", "ELY222", "MEA262", "MEA305", "MEA307", "MEA212", "MEA230", "MEA218",
    "MEA252", "MEA403", "MEA321", "MEA323", "MEA214", "MEA202", "MEA204", "MEA261", "MEA304",
    "MEA306", "MEA211", "MEA229", "MEA217", "MEA251", "MEA402", "MEA404", "MEA201", "MEA203",
    "ELY322", "ELY224", "ELY320", "ELY324", "ELY326", "ELY328", "ELY321", "ELY223", "ELY221",
    "ELY319", "ELY323", "ELY327", "ELY325",
];

/// IATA -> ICAO carrier prefixes of the watched airlines
pub const DEFAULT_PREFIX_MAP: &[(&str, &str)] = &[
    ("AF", "AFR"),
    ("LH", "DLH"),
    ("BA", "BAW"),
    ("LX", "SWR"),
    ("LY", "ELY"),
    ("ME", "MEA"),
];
